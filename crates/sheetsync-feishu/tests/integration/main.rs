//! Integration tests for sheetsync-feishu
//!
//! Uses wiremock to simulate the Feishu Open API and verifies token
//! handling, request shapes, response classification, and a full sync
//! through the delivery pipeline.

mod common;

mod test_auth;
mod test_pipeline;
mod test_values;
