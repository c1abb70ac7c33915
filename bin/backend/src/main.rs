//! Unified Auth Backend Binary
//!
//! Identity resolution, verification challenges, and sessions behind a
//! single server. Runs on BIND_ADDR (e.g. 0.0.0.0:8888).

#[tokio::main]
async fn main() {
    bnt_core::log();
    bnt_core::kys();
    bnt_server::run().await.unwrap();
}
