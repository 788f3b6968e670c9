#[cfg(test)]
mod tests {
    use reqwest::{blocking::Client, StatusCode};
    use serde_json::{json, Value};
    use simtest::{simulation_test, SimulationServer};

    fn get(server: &SimulationServer, path_and_query: &str) -> reqwest::blocking::Response {
        Client::new()
            .get(format!("{}{}", server.url(), path_and_query))
            .header("Accept", "application/json")
            .send()
            .unwrap()
    }

    #[simulation_test("fixtures/query_collection.json")]
    fn query_collection_ignores_extra_parameters(server: &SimulationServer) {
        let response = get(
            server,
            "/api/v2/UserStory?take=3&access_token=abc123&format=json",
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/json; charset=utf-8"
        );
        let body: Value = response.json().unwrap();
        assert_eq!(body["items"][1]["name"], "Test UserStory 2");
    }

    #[simulation_test("fixtures/query_collection.json")]
    fn pinned_parameter_must_match(server: &SimulationServer) {
        let response = get(server, "/api/v2/UserStory?take=4");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.text().unwrap(),
            "no matching simulation for GET /api/v2/UserStory?take=4"
        );
    }

    #[simulation_test("fixtures/empty.json")]
    fn empty_simulation_reports_the_miss(server: &SimulationServer) {
        let response = get(server, "/api/v1/Users");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert!(response
            .text()
            .unwrap()
            .contains("GET /api/v1/Users"));
    }

    #[simulation_test("fixtures/inspect_types.json")]
    fn opaque_body_is_served_verbatim(server: &SimulationServer) {
        let response = get(server, "/api/v1/Index/meta");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/xml");
        let expected = &server.simulation().pairs[0].response.body;
        assert_eq!(response.bytes().unwrap().to_vec(), expected.to_bytes());
    }

    #[simulation_test("fixtures/create_entity.json")]
    fn method_is_part_of_the_match(server: &SimulationServer) {
        let created = Client::new()
            .post(format!("{}/api/v1/UserStories", server.url()))
            .body(r#"{"Name":"Pay with card"}"#)
            .send()
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let body: Value = created.json().unwrap();
        assert_eq!(body["Id"], 103);

        let listed = get(server, "/api/v1/UserStories");
        assert_eq!(listed.status(), StatusCode::NOT_FOUND);
    }

    #[simulation_test("fixtures/query_collection.json")]
    fn requests_are_logged_in_order(server: &SimulationServer) {
        get(server, "/api/v2/UserStory?take=3&access_token=abc123");
        get(server, "/api/v1/Missing?where=Name%20eq%20%27a+b%27");

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/api/v2/UserStory");
        assert_eq!(requests[0].query_value("access_token"), Some("abc123"));
        assert_eq!(
            requests[0].headers.get("accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(requests[1].query_value("where"), Some("Name eq 'a b'"));
    }

    #[simulation_test("fixtures/filter_collection.json", "fixtures/query_collection.json")]
    fn fixture_files_are_concatenated_in_order(server: &SimulationServer) {
        assert_eq!(server.simulation().len(), 2);

        let filtered: Value = get(server, "/api/v2/UserStory?take=3&where=effort%20%3E%201")
            .json()
            .unwrap();
        assert_eq!(filtered["items"].as_array().map(Vec::len), Some(1));

        let all: Value = get(server, "/api/v2/UserStory?take=3").json().unwrap();
        assert_eq!(all["items"].as_array().map(Vec::len), Some(2));
    }

    #[simulation_test("fixtures/query_collection.json", "fixtures/filter_collection.json")]
    fn earlier_file_wins_when_both_match(server: &SimulationServer) {
        let body: Value = get(server, "/api/v2/UserStory?take=3&where=effort%20%3E%201")
            .json()
            .unwrap();

        assert_eq!(
            body["next"],
            json!("https://test.tpondemand.com/api/v2/UserStory?take=3&skip=3&access_token=REDACTED")
        );
    }

    #[simulation_test("fixtures/query_collection.json")]
    fn test_body_can_return_a_value(server: &SimulationServer) -> Result<(), reqwest::Error> {
        let response = get(server, "/api/v2/UserStory?take=3");
        response.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod round_trip {
    use async_trait::async_trait;
    use hyper::{Body, Request, Response};
    use reqwest::blocking;
    use simtest::{
        HttpTransport, RecordingTransport, RedactOptions, Redactor, SimulationServer,
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::runtime::Runtime;

    const LIVE_DOMAIN: &str = "acme.tpondemand.com";
    const TOKEN: &str = "live-token-91ac";

    #[derive(Debug)]
    struct LiveApi;

    #[async_trait]
    impl HttpTransport for LiveApi {
        async fn round_trip(
            &self,
            request: Request<Body>,
        ) -> Result<Response<Body>, simtest::Error> {
            let body = match request.uri().path() {
                "/api/v1/Index/meta" => String::from(
                    r#"<ResourceMetadataDescriptionIndex><ResourceMetadataDescription Name="Bug" Description="Internal triage notes" Uri="https://acme.tpondemand.com/api/v1/Bugs/meta"/></ResourceMetadataDescriptionIndex>"#,
                ),
                _ => String::from(
                    r#"{"items":[{"resourceType":"UserStory","id":7,"name":"Pay with card","project":{"resourceType":"Project","name":"Checkout"},"owner":{"resourceType":"GeneralUser","email":"jane@acme.io"}}]}"#,
                ),
            };
            let content_type = if body.starts_with('<') {
                "text/xml"
            } else {
                "application/json"
            };

            Ok(Response::builder()
                .status(200)
                .header("Content-Type", content_type)
                .header("Set-Cookie", "session=abc")
                .body(Body::from(body))?)
        }
    }

    async fn send(transport: &RecordingTransport<LiveApi>, path_and_query: &str) {
        let request = Request::get(format!("https://{}{}", LIVE_DOMAIN, path_and_query))
            .body(Body::empty())
            .unwrap();
        let response = transport.round_trip(request).await.unwrap();
        hyper::body::to_bytes(response.into_body()).await.unwrap();
    }

    #[test]
    fn captured_fixture_replays_the_redacted_exchange() {
        let transport = Arc::new(RecordingTransport::new(LiveApi));
        Runtime::new().unwrap().block_on(async {
            send(
                &transport,
                &format!("/api/v2/UserStory?take=1&access_token={}&format=json", TOKEN),
            )
            .await;
            send(&transport, &format!("/api/v1/Index/meta?access_token={}", TOKEN)).await;
        });

        let mut redactor = Redactor::new(
            RedactOptions::new(LIVE_DOMAIN).with_access_token(TOKEN),
        );
        let simulation = redactor.redact(transport.take_simulation().unwrap());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("round_trip.json");
        simtest::save_simulation(&path, &simulation).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(!saved.contains(TOKEN));
        assert!(!saved.contains(LIVE_DOMAIN));
        assert!(!saved.contains("Set-Cookie"));

        let reloaded = simtest::load_simulation(&path).unwrap();
        assert_eq!(reloaded, simulation);

        let mut server = SimulationServer::start(reloaded).unwrap();

        let stories = blocking::get(format!("{}/api/v2/UserStory?take=1", server.url()))
            .unwrap()
            .text()
            .unwrap();
        assert_eq!(
            stories,
            r#"{"items":[{"resourceType":"UserStory","id":7,"name":"Test UserStory 1","project":{"resourceType":"Project","name":"Test Project 1"},"owner":{"resourceType":"GeneralUser","email":"testuser@example.com"}}]}"#
        );

        let meta = blocking::get(format!("{}/api/v1/Index/meta", server.url()))
            .unwrap()
            .text()
            .unwrap();
        assert_eq!(
            meta,
            r#"<ResourceMetadataDescriptionIndex><ResourceMetadataDescription Name="Bug" Description="Redacted description" Uri="https://test.tpondemand.com/api/v1/Bugs/meta"/></ResourceMetadataDescriptionIndex>"#
        );

        server.close();
        assert!(blocking::get(format!("{}/api/v1/Index/meta", server.url())).is_err());
    }
}
