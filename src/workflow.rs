// The two operator workflows: uploading a subject's photos to a new
// avatar and the single-shot measurement download. Both are linear call
// sequences; the first failing request aborts the run with no rollback.

use anyhow::Result;
use log::info;
use std::path::PathBuf;

use crate::api::{ApiClient, FitRequest};
use crate::measurements::{convert_measurements, write_measurements};
use crate::subject::Subject;

/// Remote state in which measurements are available.
const STATE_READY: &str = "READY";

/// Result of one download attempt. Only transport/IO problems are errors;
/// "not ready yet" and "nothing to save" are ordinary outcomes the
/// operator retries later by re-running the tool.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Measurements converted and written to the given path.
    Saved(PathBuf),
    /// Avatar is READY but the response carried no measurements.
    Empty,
    /// Avatar still processing; holds the reported state string.
    NotReady(String),
}

/// Create a remote avatar for the subject, upload its photos and start
/// the fitting process. Returns the new avatar id.
///
/// The id is written into `avatar.json` immediately after creation, before
/// any image upload. A run that dies after that checkpoint leaves a
/// subject that looks identical to a fully-fitted one on the next start;
/// that ambiguity is a known property of the flow.
pub fn upload_avatar(api: &ApiClient, subject: &mut Subject) -> Result<String> {
    println!("Creating avatar...");
    let avatar_id = api.create_avatar()?;
    println!("✓ Avatar created with ID: {}", avatar_id);

    let metadata_path = subject.save_avatar_id(&avatar_id)?;
    println!("✓ Avatar ID saved to {}", metadata_path.display());

    println!("Uploading images...");
    for image in &subject.images {
        let file_name = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image");
        println!("  Uploading {}...", file_name);
        // Each photo gets its own presigned slot; the pair of requests is
        // independent per image, so a failure can leave earlier photos
        // uploaded with no compensation.
        let upload_url = api.request_upload_slot(&avatar_id)?;
        api.upload_image(&upload_url, image)?;
    }
    println!("✓ Uploaded {} images", subject.images.len());

    println!("Starting fitting process...");
    let fit = FitRequest::new(
        subject.name.clone(),
        subject.gender,
        subject.metadata.height,
        subject.metadata.weight,
    );
    api.start_fitting(&avatar_id, &fit)?;
    println!("✓ Fitting process started");
    info!("fitting started for avatar {}", avatar_id);

    Ok(avatar_id)
}

/// Check the avatar's remote state once. If it is READY and the document
/// carries measurements, convert them and write `measurements.json` into
/// the subject directory. No waiting and no retry; anything other than
/// READY is reported back as-is.
pub fn download_measurements(
    api: &ApiClient,
    subject: &Subject,
    avatar_id: &str,
) -> Result<FetchOutcome> {
    println!("Checking avatar status...");
    let doc = api.fetch_avatar(avatar_id)?;

    let state = doc["data"]["attributes"]["state"]
        .as_str()
        .unwrap_or("UNKNOWN");
    if state != STATE_READY {
        info!("avatar {} not ready, state {}", avatar_id, state);
        return Ok(FetchOutcome::NotReady(state.to_string()));
    }

    println!("✓ Avatar is ready! Downloading measurements...");
    let raw = doc["data"]["attributes"]["metadata"]["bodyShape"]["mesh_measurements"].as_object();
    match raw {
        Some(map) if !map.is_empty() => {
            let converted = convert_measurements(map);
            let path = subject.measurements_path();
            write_measurements(&path, &converted)?;
            println!("✓ Measurements saved to {}", path.display());
            Ok(FetchOutcome::Saved(path))
        }
        _ => Ok(FetchOutcome::Empty),
    }
}
