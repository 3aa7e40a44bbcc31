//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds an in-process router backed by a
//! temporary data directory, plus helpers for driving it without a
//! listening socket.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use hlsgate::config::Config;
use hlsgate::server::{create_router, AppContext};
use hlsgate::store::{MediaRecord, MediaStatus, MediaStore};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret";

pub struct TestHarness {
    pub ctx: AppContext,
    _data_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let data_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.storage.data_dir = data_dir.path().to_path_buf();

        std::fs::create_dir_all(config.storage.hls_root()).unwrap();
        std::fs::create_dir_all(config.storage.scratch_dir()).unwrap();

        let store = MediaStore::open(config.storage.db_path()).unwrap();
        let ctx = AppContext::new(config, store, SECRET.to_string());

        Self {
            ctx,
            _data_dir: data_dir,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Create a `ready` record with a playlist and `segments` segment files
    /// on disk.
    pub fn seed_ready_media(&self, segments: usize) -> MediaRecord {
        let record = MediaRecord::new(60);
        let id = record.public_id.clone();
        self.ctx.store.create(record).unwrap();
        self.ctx
            .store
            .mutate(&id, |r| {
                r.status = MediaStatus::Ready;
                Ok(())
            })
            .unwrap();
        let record = self.ctx.store.get(&id).unwrap();

        let dir = self.ctx.hls_root.join(&record.internal_id);
        std::fs::create_dir_all(&dir).unwrap();

        let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n");
        for i in 0..segments {
            playlist.push_str(&format!("#EXTINF:10.0,\nsegment{i}.ts\n"));
            std::fs::write(dir.join(format!("segment{i}.ts")), format!("seg-{i}")).unwrap();
        }
        playlist.push_str("#EXT-X-ENDLIST\n");
        std::fs::write(dir.join("playlist.m3u8"), playlist).unwrap();

        record
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request("GET", uri, Body::empty()).await
    }

    pub async fn post(&self, uri: &str) -> Response<Body> {
        self.request("POST", uri, Body::empty()).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.request("DELETE", uri, Body::empty()).await
    }

    pub async fn request(&self, method: &str, uri: &str, body: Body) -> Response<Body> {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        self.router().oneshot(req).await.unwrap()
    }
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}
