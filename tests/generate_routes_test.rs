mod common;

use actix_web::{http::StatusCode, test};
use mockito::Matcher;
use serde_json::{json, Value};
use serial_test::serial;

use common::{itinerary_json, ScriptedTransport, TestApp};

const CATEGORIES: [&str; 5] = ["main_travel", "stay", "transport", "attractions", "food"];

#[actix_rt::test]
#[serial]
async fn test_generate_survives_enrichment_outage() {
    // Both model passes insist on flying; only the overland verdict is given.
    let mut plan = itinerary_json(3, "Jaipur", "Round-trip Economy Flight", 14_000);
    plan["land_route"] = json!(true);
    let transport = ScriptedTransport::new()
        .with_draft(plan.clone())
        .with_sanitizer(plan);
    let mut test_app = TestApp::new(transport).await;
    test_app.fail_all_enrichment().await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({
            "sourceCity": "Mumbai",
            "destination": "Jaipur",
            "days": 3,
            "budget": "Cheap",
            "travelers": 2
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["destination"], "Jaipur");
    assert_eq!(body["sourceCity"], "Mumbai");
    assert_eq!(body["travelers"], 2);

    let plans = body["daily_plans"].as_array().unwrap();
    assert_eq!(plans.len(), 3);
    for (index, plan) in plans.iter().enumerate() {
        assert_eq!(plan["day"], index as u64 + 1);
        assert_eq!(plan["activities"].as_array().unwrap().len(), 3);
    }

    let breakdown = &body["budget_breakdown"];
    for category in CATEGORIES {
        assert!(
            breakdown[category]["estimate"].as_u64().is_some(),
            "{} should carry a non-negative estimate",
            category
        );
    }
    let main_label = breakdown["main_travel"]["label"].as_str().unwrap().to_lowercase();
    assert!(main_label.contains("train") || main_label.contains("bus"));
    // 11 USD x fallback rate 90 x 2 travelers x 2 directions.
    assert_eq!(breakdown["main_travel"]["estimate"], 3960);
    // Amber Fort is a paid site, so the zero entry-fee estimate is raised.
    assert!(breakdown["attractions"]["estimate"].as_u64().unwrap() > 0);

    assert_eq!(test_app.transport.calls_matching("professional travel planner"), 1);
    assert_eq!(test_app.transport.calls_matching("Sanitizer"), 1);
}

#[actix_rt::test]
#[serial]
async fn test_outage_without_land_verdict_keeps_flight() {
    let transport = ScriptedTransport::new().with_draft(itinerary_json(
        3,
        "Paris",
        "Round-trip Economy Flight",
        90_000,
    ));
    let mut test_app = TestApp::new(transport).await;
    test_app.fail_all_enrichment().await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({
            "sourceCity": "Mumbai",
            "destination": "Paris",
            "days": 3,
            "budget": "Cheap",
            "travelers": 2
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["budget_breakdown"]["main_travel"]["label"],
        "Round-trip Economy Flight"
    );
    assert_eq!(body["budget_breakdown"]["main_travel"]["estimate"], 90_000);
}

#[actix_rt::test]
#[serial]
async fn test_non_travel_query_is_rejected_before_enrichment() {
    let transport = ScriptedTransport::new().with_parser(json!({
        "isTravelRelated": false,
        "rejectionMessage": "I can only plan trips to places on Earth."
    }));
    let mut test_app = TestApp::new(transport).await;

    let token = test_app
        .server
        .mock("POST", "/v1/security/oauth2/token")
        .expect(0)
        .create_async()
        .await;
    let search = test_app
        .server
        .mock("POST", "/search")
        .expect(0)
        .create_async()
        .await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({ "query": "plan a trip to the moon" }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "I can only plan trips to places on Earth.");

    token.assert_async().await;
    search.assert_async().await;
    assert_eq!(test_app.transport.total_calls(), 1);
}

#[actix_rt::test]
#[serial]
async fn test_free_text_query_is_parsed_then_planned() {
    let transport = ScriptedTransport::new()
        .with_parser(json!({
            "isTravelRelated": true,
            "sourceCity": "Mumbai",
            "destination": "Jaipur",
            "days": "3",
            "budget": "budget",
            "travelers": 2,
            "vibe": "forts and food"
        }))
        .with_draft(itinerary_json(3, "Jaipur", "Round-trip Sleeper Class Train Fare", 4000));
    let mut test_app = TestApp::new(transport).await;
    test_app.fail_all_enrichment().await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({ "query": "3 days of forts and street food from Mumbai, two of us, cheap" }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["destination"], "Jaipur");
    assert_eq!(body["travelers"], 2);
    assert_eq!(body["daily_plans"].as_array().unwrap().len(), 3);
    assert_eq!(test_app.transport.calls_matching("travel query parser"), 1);
}

#[actix_rt::test]
#[serial]
async fn test_flight_anchor_overrides_luxury_main_travel() {
    let transport = ScriptedTransport::new().with_draft(itinerary_json(
        2,
        "Paris",
        "Flights",
        999_999,
    ));
    let mut test_app = TestApp::new(transport).await;

    let _token = test_app.mock_token().await;
    let _delhi = test_app.mock_location("Delhi", "DEL", "IN").await;
    let _paris = test_app.mock_location("Paris", "PAR", "FR").await;
    let _rate = test_app.mock_rate(84.0).await;
    let flights = test_app
        .server
        .mock("GET", "/v2/shopping/flight-offers")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("originLocationCode".into(), "DEL".into()),
            Matcher::UrlEncoded("destinationLocationCode".into(), "PAR".into()),
            Matcher::UrlEncoded("adults".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "data": [
                    { "id": "1", "price": { "total": "200.00", "currency": "USD" } },
                    { "id": "2", "price": { "total": "150.00", "currency": "USD" } }
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let _hotels = test_app
        .server
        .mock("GET", "/v1/reference-data/locations/hotels/by-city")
        .match_query(Matcher::UrlEncoded("ratings".into(), "5".into()))
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;
    let _research = test_app
        .server
        .mock("POST", "/search")
        .with_status(500)
        .create_async()
        .await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({
            "sourceCity": "Delhi",
            "destination": "Paris",
            "days": 2,
            "budget": "Luxury",
            "travelers": 1
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    flights.assert_async().await;

    let body: Value = test::read_body_json(resp).await;
    let main_travel = &body["budget_breakdown"]["main_travel"];
    // First offer: 200.00 USD * 84 = 16800, times 2.5 for business class.
    assert_eq!(main_travel["estimate"], 42_000);
    assert_eq!(main_travel["label"], "Business Class Flight");

    let draft_prompts = test_app
        .transport
        .user_prompts_for("professional travel planner");
    assert_eq!(draft_prompts.len(), 1);
    assert!(draft_prompts[0].contains("INR 16,800"));
}

#[actix_rt::test]
#[serial]
async fn test_missing_fields_without_query() {
    let test_app = TestApp::new(ScriptedTransport::new()).await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({ "sourceCity": "Mumbai", "days": 3 }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(test_app.transport.total_calls(), 0);
}

#[actix_rt::test]
#[serial]
async fn test_invalid_json_body() {
    let test_app = TestApp::new(ScriptedTransport::new()).await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/generate")
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[actix_rt::test]
#[serial]
async fn test_draft_failure_is_server_error() {
    // No draft reply scripted: the model call fails.
    let mut test_app = TestApp::new(ScriptedTransport::new()).await;
    test_app.fail_all_enrichment().await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({
            "sourceCity": "Mumbai",
            "destination": "Goa",
            "days": 4,
            "budget": "Mid",
            "travelers": 2
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().is_some());
    assert_eq!(test_app.transport.calls_matching("Sanitizer"), 0);
}

#[actix_rt::test]
#[serial]
async fn test_unparseable_draft_is_server_error() {
    let transport = ScriptedTransport::new().with_raw_draft("Sorry, I cannot help with that.");
    let mut test_app = TestApp::new(transport).await;
    test_app.fail_all_enrichment().await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({
            "sourceCity": "Mumbai",
            "destination": "Goa",
            "days": 2,
            "budget": "Mid",
            "travelers": 1
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_rt::test]
#[serial]
async fn test_short_plan_is_server_error() {
    let transport =
        ScriptedTransport::new().with_draft(itinerary_json(2, "Jaipur", "Train", 1200));
    let mut test_app = TestApp::new(transport).await;
    test_app.fail_all_enrichment().await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({
            "sourceCity": "Mumbai",
            "destination": "Jaipur",
            "days": 5,
            "budget": "Cheap",
            "travelers": 1
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_rt::test]
#[serial]
async fn test_sanitized_plan_is_preferred() {
    let mut sanitized = itinerary_json(2, "Jaipur", "Round-trip Sleeper Class Train Fare", 2600);
    sanitized["trip_summary"] = json!("Two tidy days in the Pink City");
    let transport = ScriptedTransport::new()
        .with_draft(itinerary_json(2, "Jaipur", "Round-trip Sleeper Class Train Fare", 2600))
        .with_sanitizer(sanitized);
    let mut test_app = TestApp::new(transport).await;
    test_app.fail_all_enrichment().await;

    let app = test::init_service(test_app.create_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/generate")
        .set_json(json!({
            "sourceCity": "Mumbai",
            "destination": "Jaipur",
            "days": 2,
            "budget": "Cheap",
            "travelers": 1
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["trip_summary"], "Two tidy days in the Pink City");
}
