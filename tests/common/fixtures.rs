//! Markup fixtures and mock resource servers

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Small PNG signature used as image content
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Small GIF header used as image content
pub const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00";

/// Two images, each wrapped in a link to its original-quality variant under `/orig/`
///
/// `{origin}` is replaced with the mock server's URI.
pub fn two_linked_images(origin: &str) -> String {
    format!(
        r#"<div class="article-content">
<p>첫 번째</p>
<a href="{origin}/orig/one.png" target="_blank"><img src="{origin}/img/one.png" loading="lazy"></a>
<p>second</p>
<a href="{origin}/orig/two.gif"><img src="{origin}/img/two.gif"></a>
</div>"#
    )
}

/// An emoticon with a declared original next to a regular image
pub fn emoticon_and_image(origin: &str) -> String {
    format!(
        r#"<p><a href="{origin}/orig/smile.png"><img class="arca-emoticon" src="{origin}/emo/smile.png"></a>
<img src="{origin}/img/photo.png"></p>"#
    )
}

/// Mount a 200 response with `body` and `content_type` at `route`
pub async fn mount_resource(server: &MockServer, route: &str, content_type: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", content_type)
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

/// Mount a bare status response at `route`
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Mount a resource that must never be requested
pub async fn mount_unexpected(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}
