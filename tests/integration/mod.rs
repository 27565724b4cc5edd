// End-to-end reads against a mock Chargebee API:
// - parent listing with offset pagination
// - one scheduled-changes lookup per subscription
// - 404 ignored, other failures fatal
// - incremental state for the subscription stream

mod config_integration;
