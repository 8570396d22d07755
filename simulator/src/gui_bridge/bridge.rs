use crate::gui_bridge::model::FireControlQuery;
use crate::workflow::runner::Runner;
use log::{info, warn};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use warp::{http::StatusCode, Filter};

#[derive(Debug)]
struct BridgeError;

impl warp::reject::Reject for BridgeError {}

/// JSON view of a running simulator: tracks, status and fire-control queries.
pub fn routes(
    runner: Runner,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let runner_filter = warp::any().map(move || runner.clone());

    let tracks_route = warp::path("tracks")
        .and(warp::path::end())
        .and(warp::get())
        .and(runner_filter.clone())
        .map(|runner: Runner| warp::reply::json(&runner.tracks()));

    let status_route = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(runner_filter.clone())
        .and_then(|runner: Runner| async move {
            match runner.status().await {
                Ok(report) => Ok::<_, warp::Rejection>(warp::reply::json(&report)),
                Err(err) => {
                    warn!("status request failed: {}", err);
                    Err(warp::reject::custom(BridgeError))
                }
            }
        });

    let fire_control_route = warp::path("fire-control")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(runner_filter)
        .map(|query: FireControlQuery, runner: Runner| {
            warp::reply::with_status(
                warp::reply::json(&runner.query(&query.ids)),
                StatusCode::OK,
            )
        });

    tracks_route.or(status_route).or(fire_control_route)
}

pub fn spawn(runner: Runner, addr: SocketAddr) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let stopper = runner.clone();
    let (bound, server) = warp::serve(routes(runner))
        .try_bind_with_graceful_shutdown(addr, async move { stopper.stopped().await })?;
    info!("status bridge listening on http://{}", bound);
    Ok((bound, tokio::spawn(server)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::{Role, SimulatorConfig};
    use radarcore::generator::{GeneratorConfig, MotionMode};
    use serde_json::Value;

    fn standalone() -> Runner {
        Runner::new(SimulatorConfig {
            role: Role::Standalone,
            motion: MotionMode::Linear,
            generator: GeneratorConfig {
                seed: Some(3),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn tracks_route_lists_current_tracks() {
        let runner = standalone();
        runner.tick().await.unwrap();
        let response = warp::test::request()
            .method("GET")
            .path("/tracks")
            .reply(&routes(runner))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        let tracks = body.as_array().unwrap();
        assert_eq!(tracks.len(), 6);
        assert_eq!(tracks[0]["id"], 101);
        assert_eq!(tracks[0]["source"], "fused");
    }

    #[tokio::test]
    async fn status_route_reports_mode_and_metrics() {
        let runner = standalone();
        runner.tick().await.unwrap();
        let response = warp::test::request()
            .method("GET")
            .path("/status")
            .reply(&routes(runner))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["role"], "standalone");
        assert_eq!(body["mode"], "range-search");
        assert_eq!(body["motion"], "linear");
        assert_eq!(body["ticks"], 1);
        assert_eq!(body["link_active"], false);
        assert_eq!(body["metrics"]["frames_sent"], 0);
    }

    #[tokio::test]
    async fn fire_control_route_answers_queries() {
        let runner = standalone();
        let empty = warp::test::request()
            .method("POST")
            .path("/fire-control")
            .json(&FireControlQuery { ids: vec![7] })
            .reply(&routes(runner.clone()))
            .await;
        let body: Value = serde_json::from_slice(empty.body()).unwrap();
        assert_eq!(body[0]["status"], "NO_TARGET");

        runner.tick().await.unwrap();
        let response = warp::test::request()
            .method("POST")
            .path("/fire-control")
            .json(&FireControlQuery { ids: vec![101, 7] })
            .reply(&routes(runner))
            .await;
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body[0]["status"], "OK");
        assert_eq!(body[0]["track"]["id"], 101);
        assert_eq!(body[1]["status"], "FALLBACK");
    }

    #[tokio::test]
    async fn unknown_path_is_rejected() {
        let response = warp::test::request()
            .method("GET")
            .path("/payload")
            .reply(&routes(standalone()))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
