mod common;

use std::collections::HashSet;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;

use common::{body_bytes, body_json, memory_body, png_base64, test_app, test_app_with};
use keepsake::api::SKIPPED_MEDIA_HEADER;
use keepsake::media;

#[tokio::test]
async fn upload_then_get_by_numeric_and_full_id() {
    let app = test_app().await;
    let image = png_base64(8, 8);

    let stored = app
        .upload(serde_json::json!({
            "id": "m_001",
            "title": "Trip",
            "description": "Lake",
            "timestamp": "2024-06-01T12:00:00Z",
            "location": { "name": "Tahoe", "coordinates": { "lat": 39.1, "lng": -120.0 } },
            "media": { "images_data": [ { "filename": "a.png", "data_base64": image } ] }
        }))
        .await;
    assert_eq!(stored["id"], "m_001");

    let by_seq = body_json(app.get("/memory/1").await).await;
    let by_id = body_json(app.get("/memory/m_001").await).await;
    assert_eq!(by_seq, stored);
    assert_eq!(by_id, stored);

    assert_eq!(by_seq["title"], "Trip");
    assert_eq!(by_seq["description"], "Lake");
    assert_eq!(by_seq["timestamp"], "2024-06-01T12:00:00Z");
    assert_eq!(by_seq["location"]["name"], "Tahoe");
    assert_eq!(by_seq["media"]["images_data"][0]["filename"], "a.png");
    assert_eq!(by_seq["media"]["images_data"][0]["data_base64"], image);
}

#[tokio::test]
async fn get_unknown_memory_is_not_found() {
    let app = test_app().await;
    let response = app.get("/memory/42").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "not_found");
}

#[tokio::test]
async fn random_on_empty_store_reports_empty_store() {
    let app = test_app().await;
    let response = app.get("/memory/random").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "empty_store");
}

#[tokio::test]
async fn random_returns_a_stored_memory() {
    let app = test_app().await;
    let mut ids = HashSet::new();
    for i in 0..3 {
        let stored = app
            .upload(memory_body(&format!("m{i}"), "2023-01-01T00:00:00Z"))
            .await;
        ids.insert(stored["id"].as_str().unwrap().to_string());
    }

    for _ in 0..10 {
        let response = app.get("/memory/random").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(ids.contains(json["id"].as_str().unwrap()));
    }
}

#[tokio::test]
async fn timeline_groups_years_newest_first() {
    let app = test_app().await;
    let older = app
        .upload(memory_body("Graduation", "2022-05-20T10:00:00Z"))
        .await;
    let newer = app
        .upload(serde_json::json!({
            "title": "Wedding",
            "timestamp": "2024-08-10T15:00:00Z",
            "media": { "images_data": [ { "filename": "w.png", "data_base64": png_base64(300, 150) } ] }
        }))
        .await;

    let years = body_json(app.get("/timeline/years").await).await;
    assert_eq!(years, serde_json::json!([2024, 2022]));

    let all = body_json(app.get("/timeline").await).await;
    assert_eq!(all[0]["id"], newer["id"]);
    assert_eq!(all[1]["id"], older["id"]);
    assert!(all[0]["thumbnail_base64"].is_string());
    assert!(all[1].get("thumbnail_base64").is_none());

    let y2022 = body_json(app.get("/timeline?year=2022").await).await;
    assert_eq!(y2022.as_array().unwrap().len(), 1);
    assert_eq!(y2022[0]["id"], older["id"]);

    let empty = body_json(app.get("/timeline?year=1999").await).await;
    assert_eq!(empty, serde_json::json!([]));
}

#[tokio::test]
async fn timeline_thumbnail_is_a_small_jpeg() {
    let app = test_app_with(|config| config.timeline.thumbnail_size = 64).await;
    app.upload(serde_json::json!({
        "title": "Panorama",
        "timestamp": "2024-01-01T00:00:00Z",
        "media": { "images_data": [ { "filename": "p.png", "data_base64": png_base64(300, 150) } ] }
    }))
    .await;

    let all = body_json(app.get("/timeline").await).await;
    let thumb = media::decode(all[0]["thumbnail_base64"].as_str().unwrap()).unwrap();
    assert_eq!(media::content_type(&thumb), "image/jpeg");

    let decoded = image::load_from_memory(&thumb).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 32));
}

#[tokio::test]
async fn search_is_case_insensitive_and_ordered() {
    let app = test_app().await;
    app.upload(memory_body("Beach Day", "2020-01-01T00:00:00Z")).await;
    app.upload(serde_json::json!({
        "title": "Hike",
        "description": "saw the BEACH",
        "timestamp": "2021-01-01T00:00:00Z"
    }))
    .await;
    app.upload(memory_body("Mountains", "2022-01-01T00:00:00Z")).await;

    let hits = body_json(app.get("/search?q=beach").await).await;
    let ids: Vec<_> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["m_001", "m_002"]);

    let all = body_json(app.get("/search").await).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let limited = body_json(app.get("/search?q=&limit=2").await).await;
    assert_eq!(limited.as_array().unwrap().len(), 2);

    let none = body_json(app.get("/search?q=desert").await).await;
    assert_eq!(none, serde_json::json!([]));
}

#[tokio::test]
async fn search_result_shape() {
    let app = test_app().await;
    app.upload(serde_json::json!({
        "title": "Zoo",
        "timestamp": "2021-05-05T00:00:00Z",
        "tags": ["animals"],
        "location": { "name": "City Zoo", "coordinates": { "lat": 1.5, "lng": 2.5 } },
        "media": { "images_data": [ { "filename": "lion.png", "data_base64": png_base64(4, 4) } ] }
    }))
    .await;

    let hits = body_json(app.get("/search?q=zoo").await).await;
    assert_eq!(
        hits[0],
        serde_json::json!({
            "id": "m_001",
            "title": "Zoo",
            "description": "",
            "timestamp": "2021-05-05T00:00:00Z",
            "keywords": ["animals"],
            "location": { "name": "City Zoo", "coordinates": { "lat": 1.5, "lng": 2.5 } },
            "media": { "images": ["/memory/m_001/media/lion.png"] }
        })
    );
}

#[tokio::test]
async fn search_zero_limit_is_rejected() {
    let app = test_app().await;
    let response = app.get("/search?limit=0").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["field"], "limit");
}

#[tokio::test]
async fn search_sees_memories_created_after_a_cached_query() {
    let app = test_app().await;
    app.upload(memory_body("Lake one", "2020-01-01T00:00:00Z")).await;
    let first = body_json(app.get("/search?q=lake").await).await;
    assert_eq!(first.as_array().unwrap().len(), 1);

    app.upload(memory_body("Lake two", "2020-02-01T00:00:00Z")).await;
    let second = body_json(app.get("/search?q=lake").await).await;
    assert_eq!(second.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_uploads_get_distinct_ids() {
    let app = test_app().await;

    let mut handles = Vec::new();
    for i in 0..100 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let body = memory_body(&format!("Concurrent {i}"), "2023-03-03T00:00:00Z");
            let response = tower::ServiceExt::oneshot(
                router,
                common::json_request("POST", "/memory/upload", &body),
            )
            .await
            .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            body_json(response).await["id"].as_str().unwrap().to_string()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 100);

    let health = body_json(app.get("/health").await).await;
    assert_eq!(health["memories"], 100);
    assert_eq!(app.state.timeline.len(), 100);
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let app = test_app().await;

    let cases = [
        (serde_json::json!({ "timestamp": "2024-01-01T00:00:00Z" }), "title"),
        (serde_json::json!({ "title": "   ", "timestamp": "2024-01-01T00:00:00Z" }), "title"),
        (serde_json::json!({ "title": "x" }), "timestamp"),
        (serde_json::json!({ "title": "x", "timestamp": "not a date" }), "timestamp"),
        (
            serde_json::json!({ "title": "x", "timestamp": "9999-12-31T23:00:00-05:00" }),
            "timestamp",
        ),
        (
            serde_json::json!({
                "title": "x",
                "timestamp": "2024-01-01T00:00:00Z",
                "media": { "images_data": [ { "data_base64": "" } ] }
            }),
            "media.images_data[0].filename",
        ),
        (
            serde_json::json!({
                "title": "x",
                "timestamp": "2024-01-01T00:00:00Z",
                "location": { "name": "N", "coordinates": { "lat": 91.0, "lng": 0.0 } }
            }),
            "location.coordinates.lat",
        ),
        (
            serde_json::json!({
                "title": "x",
                "timestamp": "2024-01-01T00:00:00Z",
                "location": { "name": "N", "coordinates": { "lat": 10.0 } }
            }),
            "location.coordinates.lng",
        ),
        (
            serde_json::json!({
                "title": "x",
                "timestamp": "2024-01-01T00:00:00Z",
                "media": { "images_data": [ { "filename": "../etc", "data_base64": "" } ] }
            }),
            "media.images_data[0].filename",
        ),
        (
            serde_json::json!({ "title": "x", "timestamp": "2024-01-01T00:00:00Z", "mood": "sunny" }),
            "mood",
        ),
    ];

    for (body, field) in cases {
        let response = app.post_json("/memory/upload", &body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request", "body: {body}");
        assert_eq!(json["error"]["field"], field, "body: {body}");
    }

    let health = body_json(app.get("/health").await).await;
    assert_eq!(health["memories"], 0);
}

#[tokio::test]
async fn duplicate_filenames_are_rejected() {
    let app = test_app().await;
    let image = png_base64(2, 2);
    let response = app
        .post_json(
            "/memory/upload",
            &serde_json::json!({
                "title": "x",
                "timestamp": "2024-01-01T00:00:00Z",
                "media": { "images_data": [
                    { "filename": "a.png", "data_base64": image },
                    { "filename": "a.png", "data_base64": image }
                ] }
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["field"], "media.images_data[1].filename");
}

#[tokio::test]
async fn undecodable_images_are_skipped_and_counted() {
    let app = test_app().await;
    let response = app
        .post_json(
            "/memory/upload",
            &serde_json::json!({
                "title": "Mixed",
                "timestamp": "2024-01-01T00:00:00Z",
                "media": { "images_data": [
                    { "filename": "good.png", "data_base64": png_base64(2, 2) },
                    { "filename": "bad.png", "data_base64": "%%%not base64%%%" }
                ] }
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[SKIPPED_MEDIA_HEADER], "1");
    let json = body_json(response).await;
    let images = json["media"]["images_data"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["filename"], "good.png");
}

#[tokio::test]
async fn strict_mode_rejects_when_every_image_fails() {
    let app = test_app_with(|config| config.media.strict = true).await;
    let response = app
        .post_json(
            "/memory/upload",
            &serde_json::json!({
                "title": "Broken",
                "timestamp": "2024-01-01T00:00:00Z",
                "media": { "images_data": [ { "filename": "bad.png", "data_base64": "bm9wZQ==" } ] }
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "invalid_media");
    assert_eq!(json["error"]["field"], "media.images_data[0].data_base64");
}

#[tokio::test]
async fn media_endpoint_serves_bytes_with_etag() {
    let app = test_app().await;
    let image = png_base64(6, 6);
    app.upload(serde_json::json!({
        "title": "Pic",
        "timestamp": "2024-01-01T00:00:00Z",
        "media": { "images_data": [ { "filename": "pic.png", "data_base64": image } ] }
    }))
    .await;

    let response = app.get("/memory/1/media/pic.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let etag = response.headers()[header::ETAG].clone();
    assert_eq!(body_bytes(response).await, media::decode(&image).unwrap());

    let cached = app
        .send(
            Request::get("/memory/m_001/media/pic.png")
                .header(header::IF_NONE_MATCH, etag)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(cached.status(), StatusCode::NOT_MODIFIED);

    let missing = app.get("/memory/1/media/other.png").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_updates_fields_and_views() {
    let app = test_app().await;
    app.upload(serde_json::json!({
        "title": "Old",
        "timestamp": "2020-01-01T00:00:00Z",
        "location": { "name": "Home" }
    }))
    .await;

    let response = app
        .patch_json(
            "/memory/1",
            &serde_json::json!({
                "title": "Renamed",
                "timestamp": "2023-07-07T00:00:00Z",
                "location": null
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "Renamed");
    assert!(json.get("location").is_none());

    let years = body_json(app.get("/timeline/years").await).await;
    assert_eq!(years, serde_json::json!([2023]));
    let hits = body_json(app.get("/search?q=renamed").await).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_removes_memory_everywhere() {
    let app = test_app().await;
    app.upload(memory_body("Gone soon", "2021-01-01T00:00:00Z")).await;

    let response = app.delete("/memory/m_001").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(app.get("/memory/1").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(app.get("/timeline").await).await, serde_json::json!([]));
    assert_eq!(body_json(app.get("/search").await).await, serde_json::json!([]));
    assert_eq!(app.delete("/memory/1").await.status(), StatusCode::NOT_FOUND);

    // Ids are never reused.
    let next = app.upload(memory_body("Next", "2021-01-01T00:00:00Z")).await;
    assert_eq!(next["id"], "m_002");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = test_app().await;
    let response = app
        .send(
            Request::post("/memory/upload")
                .header("content-type", "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "invalid_request");
    assert_eq!(json["error"]["field"], "body");
}

#[tokio::test]
async fn upload_with_empty_media_round_trips() {
    let app = test_app().await;
    let stored = app
        .upload(serde_json::json!({
            "title": "Trip",
            "description": "",
            "timestamp": "2024-06-01T10:00:00Z",
            "media": { "images_data": [] }
        }))
        .await;

    let id = stored["id"].as_str().unwrap();
    assert!(!id.is_empty());
    assert_eq!(stored["title"], "Trip");

    let fetched = body_json(app.get(&format!("/memory/{id}")).await).await;
    assert_eq!(fetched, stored);
}

#[tokio::test]
async fn out_of_range_timestamp_never_reaches_the_store() {
    let app = test_app().await;
    app.upload(memory_body("Fine", "2024-03-01T00:00:00Z")).await;

    let response = app
        .post_json(
            "/memory/upload",
            &memory_body("Edge", "9999-12-31T23:00:00-05:00"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let edge = app.upload(memory_body("Edge", "9999-12-31T18:00:00-05:00")).await;
    assert_eq!(edge["timestamp"], "9999-12-31T23:00:00Z");
    let fetched = body_json(app.get("/memory/2").await).await;
    assert_eq!(fetched, edge);

    let hits = body_json(app.get("/search?q=fine").await).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(app.state.timeline.rebuild_all().await.unwrap(), 2);
}

#[tokio::test]
async fn patch_with_undecodable_media_keeps_stored_images() {
    let app = test_app().await;
    let image = png_base64(4, 4);
    app.upload(serde_json::json!({
        "title": "Keep",
        "timestamp": "2024-01-01T00:00:00Z",
        "media": { "images_data": [ { "filename": "keep.png", "data_base64": image } ] }
    }))
    .await;

    let response = app
        .patch_json(
            "/memory/1",
            &serde_json::json!({
                "media": { "images_data": [ { "filename": "bad.png", "data_base64": "bm9wZQ==" } ] }
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "invalid_media");

    let stored = body_json(app.get("/memory/1").await).await;
    assert_eq!(stored["media"]["images_data"][0]["filename"], "keep.png");
    assert_eq!(app.get("/memory/1/media/keep.png").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn abandoned_upload_still_reaches_the_timeline() {
    let app = test_app().await;
    let request = common::json_request(
        "POST",
        "/memory/upload",
        &serde_json::json!({
            "title": "Impatient",
            "timestamp": "2024-01-01T00:00:00Z",
            "media": { "images_data": [ { "filename": "big.png", "data_base64": png_base64(2000, 2000) } ] }
        }),
    );
    let router = app.router.clone();
    let _ = tokio::time::timeout(
        std::time::Duration::from_millis(5),
        tower::ServiceExt::oneshot(router, request),
    )
    .await;

    let mut stored = 0;
    for _ in 0..500 {
        stored = app.state.memory.count().await.unwrap();
        if app.state.timeline.len() as u64 == stored {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(app.state.timeline.len() as u64, stored);
}
