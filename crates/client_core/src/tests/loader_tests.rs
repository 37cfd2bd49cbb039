use super::*;

use std::collections::HashMap;

use anyhow::Result;
use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use worker::{OfflineNetwork, ReqwestNetwork};

fn listing(count: u32) -> Value {
    let results: Vec<Value> = (1..=count)
        .map(|id| {
            json!({
                "name": format!("mon{id}"),
                "url": format!("https://pokeapi.co/api/v2/pokemon/{id}/"),
            })
        })
        .collect();
    json!({ "count": count, "next": null, "previous": null, "results": results })
}

async fn spawn_api(router: Router) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}/api/v2"))
}

async fn spawn_listing_api(count: u32) -> Result<String> {
    let router = Router::new().route(
        "/api/v2/pokemon",
        get(move |Query(params): Query<HashMap<String, String>>| async move {
            let limit: u32 = params
                .get("limit")
                .and_then(|l| l.parse().ok())
                .unwrap_or(20);
            Json(listing(count.min(limit)))
        }),
    );
    spawn_api(router).await
}

fn loader_for(api_base_url: String) -> SpeciesLoader {
    SpeciesLoader::new(
        Arc::new(ReqwestNetwork::new()),
        LoaderConfig {
            api_base_url,
            sprite_base_url: "https://sprites.test/".into(),
            listing_limit: DEFAULT_LISTING_LIMIT,
        },
    )
}

#[test]
fn id_is_second_to_last_segment() {
    assert_eq!(
        species_id_from_url("https://pokeapi.co/api/v2/pokemon/25/"),
        Some(SpeciesId(25))
    );
    assert_eq!(
        species_id_from_url("https://pokeapi.co/api/v2/pokemon/10001/"),
        Some(SpeciesId(10001))
    );
    assert_eq!(species_id_from_url("https://pokeapi.co/api/v2/pokemon/25"), None);
    assert_eq!(species_id_from_url("https://pokeapi.co/api/v2/pokemon/0/"), None);
    assert_eq!(species_id_from_url("pikachu"), None);
}

#[test]
fn capitalize_only_touches_first_character() {
    assert_eq!(capitalize("bulbasaur"), "Bulbasaur");
    assert_eq!(capitalize("mr-mime"), "Mr-mime");
    assert_eq!(capitalize("ho-Oh"), "Ho-Oh");
    assert_eq!(capitalize("éevee"), "Éevee");
    assert_eq!(capitalize(""), "");
}

#[test]
fn urls_follow_templates() {
    let config = LoaderConfig::default();
    assert_eq!(
        config.listing_url(),
        "https://pokeapi.co/api/v2/pokemon?limit=1292"
    );
    assert_eq!(
        config.image_url(SpeciesId(7)),
        "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/7.png"
    );
}

#[tokio::test]
async fn loads_every_entry_in_listing_order() {
    let api = spawn_listing_api(45).await.expect("spawn api");
    let collection = loader_for(api).load().await.expect("load");

    assert_eq!(collection.len(), 45);
    for (i, species) in collection.iter().enumerate() {
        let id = u32::try_from(i + 1).expect("id");
        assert_eq!(species.id, SpeciesId(id));
        assert_eq!(species.name, format!("Mon{id}"));
        assert_eq!(
            species.image_url,
            format!("https://sprites.test/sprites/pokemon/{id}.png")
        );
    }
}

#[tokio::test]
async fn sends_the_configured_limit() {
    let api = spawn_listing_api(50).await.expect("spawn api");
    let mut loader = loader_for(api);
    loader.config.listing_limit = 12;
    let collection = loader.load().await.expect("load");
    assert_eq!(collection.len(), 12);
}

#[tokio::test]
async fn non_success_status_fails_the_load() {
    let router = Router::new().route(
        "/api/v2/pokemon",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let api = spawn_api(router).await.expect("spawn api");
    let err = loader_for(api).load().await.expect_err("must fail");
    assert!(matches!(err, LoadError::Status(503)), "unexpected error: {err}");
}

#[tokio::test]
async fn malformed_body_fails_the_load() {
    let router = Router::new().route("/api/v2/pokemon", get(|| async { "not json" }));
    let api = spawn_api(router).await.expect("spawn api");
    let err = loader_for(api).load().await.expect_err("must fail");
    assert!(matches!(err, LoadError::Decode(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn one_bad_entry_fails_the_whole_load() {
    let router = Router::new().route(
        "/api/v2/pokemon",
        get(|| async {
            Json(json!({
                "results": [
                    { "name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/" },
                    { "name": "glitch", "url": "https://pokeapi.co/api/v2/pokemon/" },
                ]
            }))
        }),
    );
    let api = spawn_api(router).await.expect("spawn api");
    let err = loader_for(api).load().await.expect_err("must fail");
    assert!(
        matches!(err, LoadError::InvalidEntry { ref name, .. } if name == "glitch"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn network_failure_fails_the_load() {
    let loader = SpeciesLoader::new(Arc::new(OfflineNetwork), LoaderConfig::default());
    let err = loader.load().await.expect_err("must fail");
    assert!(matches!(err, LoadError::Transport(FetchError::Network { .. })));
}
