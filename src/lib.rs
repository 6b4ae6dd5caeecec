// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to implement the interactive tool.
//
// Module responsibilities:
// - `config`: One-time environment configuration (credentials, API base
//   URL, data root), loaded at startup and passed into the other parts.
// - `api`: Encapsulates HTTP interactions with the avatar service
//   (token exchange, avatar creation, image upload, fitting, status).
// - `subject`: Local subject folders: scanning the data root, loading and
//   normalizing `avatar.json`, collecting images, writing the id back.
// - `measurements`: Unit conversion of the downloaded measurement map and
//   persistence to `measurements.json`.
// - `workflow`: The upload sequence and the single-shot download check,
//   composed from `api` + `subject` + `measurements`.
// - `ui`: Terminal prompts and menus; delegates all work to `workflow`.
pub mod api;
pub mod config;
pub mod measurements;
pub mod subject;
pub mod ui;
pub mod workflow;
