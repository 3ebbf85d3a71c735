#![cfg(feature = "server")]

use pageseg::server::SegmentServer;
use pageseg::{Error, HostConfig, PageHost, Role, SegmentResponse};
use tiny_http::{Response, Server};

const PAGE: &str = r#"<html><head>
  <link rel="stylesheet" href="/site.css">
  <link rel="stylesheet" href="/missing.css">
</head><body>
  <header>Acme Widgets Incorporated</header>
  <main><div class="hero"></div><p>Fresh widgets shipped every single day.</p></main>
</body></html>"#;

const CSS: &str = ".hero { background-image: url(/hero.png); height: 150px }";

/// Serve PAGE at `/`, CSS at `/site.css`, 404 for everything else.
fn spawn_site() -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let response = match request.url() {
                "/" => Response::from_string(PAGE),
                "/site.css" => Response::from_string(CSS),
                _ => Response::from_string("not found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    format!("http://{}", addr)
}

fn host() -> PageHost {
    PageHost::new(HostConfig::default()).expect("Failed to create host")
}

#[test]
fn fetches_page_and_linked_styles() {
    let base = spawn_site();
    let response = host().segment_url(&format!("{}/", base)).expect("segmentation failed");
    let roles: Vec<_> = response.segments.iter().map(|s| s.role).collect();
    assert_eq!(roles, [Role::Header, Role::Main]);

    // the hero only has a background image through the linked stylesheet
    let main = &response.segments[1];
    assert!(main.html.contains("placeholder-media"), "{}", main.html);
    assert!(!main.html.contains("url("));
    assert!(!response.segments[0].html.contains("Acme"));
}

#[test]
fn http_error_status_maps_to_bad_gateway() {
    let base = spawn_site();
    let url = format!("{}/nope", base);
    let err = host().segment_url(&url).unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    assert_eq!(err.status_code(), 502);
    assert_eq!(err.to_string(), format!("HTTP 404 from {}", url));
}

#[test]
fn unreachable_host_maps_to_bad_gateway() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = host().segment_url(&format!("http://127.0.0.1:{}/", port)).unwrap_err();
    assert!(matches!(err, Error::NavigationError { .. }), "{:?}", err);
    assert_eq!(err.status_code(), 502);
    assert!(err.to_string().starts_with("Navigation to http://127.0.0.1:"));
}

#[test]
fn missing_and_invalid_urls_are_client_errors() {
    let h = host();
    assert_eq!(h.segment_url("").unwrap_err().status_code(), 400);
    assert_eq!(h.segment_url("::not a url::").unwrap_err().status_code(), 400);
}

#[test]
fn http_surface_end_to_end() {
    let site = spawn_site();
    let server = SegmentServer::bind("127.0.0.1:0", HostConfig::default()).unwrap();
    let addr = server.local_addr().unwrap();
    std::thread::spawn(move || server.run());

    let client = reqwest::blocking::Client::new();
    let endpoint = format!("http://{}/segment", addr);

    let ok = client
        .post(&endpoint)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({ "url": format!("{}/", site) }).to_string())
        .send()
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    assert_eq!(
        ok.headers().get("Access-Control-Allow-Origin").unwrap().to_str().unwrap(),
        "*"
    );
    let body: SegmentResponse = serde_json::from_str(&ok.text().unwrap()).unwrap();
    assert_eq!(body.segments.len(), 2);

    let missing = client.post(&endpoint).body("{}").send().unwrap();
    assert_eq!(missing.status().as_u16(), 400);
    let err: serde_json::Value = serde_json::from_str(&missing.text().unwrap()).unwrap();
    assert_eq!(err["error"], "No URL provided");

    let upstream = client
        .post(&endpoint)
        .body(serde_json::json!({ "url": format!("{}/gone", site) }).to_string())
        .send()
        .unwrap();
    assert_eq!(upstream.status().as_u16(), 502);

    let other = client.get(format!("http://{}/", addr)).send().unwrap();
    assert_eq!(other.status().as_u16(), 404);
}
