#![allow(dead_code)] // Different tests use different parts.

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;
use cmsadmin::auth::AuthSubsystem;
use cmsadmin::commons::audit::MemoryAuditSink;
use cmsadmin::commons::confstore::ConfigStore;
use cmsadmin::daemon::config::Config;
use cmsadmin::daemon::http::HttpServer;
use cmsadmin::daemon::start::{builtin_catalog, serve};
use cmsadmin::jobs::JobsScheduler;


pub const ADMIN_TOKEN: &str = "secret";

pub fn init_logging() {
    let _ = stderrlog::new().module("cmsadmin").verbosity(3).init();
}

/// Creates the subsystems on top of a store.
pub fn subsystems(
    store: &ConfigStore, audit: Arc<MemoryAuditSink>,
) -> (Arc<AuthSubsystem>, Arc<JobsScheduler>) {
    let catalog = Arc::new(builtin_catalog().unwrap());
    let auths = AuthSubsystem::new(store, catalog.clone()).unwrap();
    let jobs = JobsScheduler::new(store, catalog, audit).unwrap();
    (Arc::new(auths), Arc::new(jobs))
}


//------------ TestDaemon ----------------------------------------------------

/// A daemon serving the admin API on an ephemeral port.
pub struct TestDaemon {
    pub uri: Url,
    pub store: ConfigStore,
    pub auths: Arc<AuthSubsystem>,
    pub jobs: Arc<JobsScheduler>,
    pub audit: Arc<MemoryAuditSink>,
    task: JoinHandle<()>,
}

impl TestDaemon {
    pub async fn start() -> Self {
        Self::start_with_limit(None).await
    }

    pub async fn start_with_limit(post_limit_api: Option<u64>) -> Self {
        init_logging();
        let mut config = Config::test(
            Url::parse("memory:///").unwrap(), ADMIN_TOKEN
        );
        if let Some(limit) = post_limit_api {
            config.post_limit_api = limit;
        }

        let store = ConfigStore::memory();
        let audit = Arc::new(MemoryAuditSink::default());
        let (auths, jobs) = subsystems(&store, audit.clone());
        let server = Arc::new(HttpServer::new(
            auths.clone(), jobs.clone(), audit.clone(), Arc::new(config)
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let uri = Url::parse(
            &format!("http://{}/", listener.local_addr().unwrap())
        ).unwrap();
        let task = tokio::spawn(serve(listener, server));

        TestDaemon { uri, store, auths, jobs, audit, task }
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}
