// UI layer: the interactive run. Prints the subject list, reads a
// 1-based numeric selection, offers the actions valid for that subject
// and dispatches into `workflow`.

use anyhow::{Context, Result};
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::api::ApiClient;
use crate::config::Config;
use crate::subject::{self, Subject};
use crate::workflow::{self, FetchOutcome};

enum Action {
    Upload,
    Download,
}

/// One interactive run: pick a subject, pick an action, authenticate,
/// execute. Blocks until the workflow finishes or fails.
pub fn run(config: &Config, mut api: ApiClient) -> Result<()> {
    let subjects = subject::list_subjects(&config.data_dir)?;
    if subjects.is_empty() {
        println!("No subjects found in {}/", config.data_dir.display());
        return Ok(());
    }

    println!("Available subjects:");
    for (i, name) in subjects.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }

    let selected = &subjects[prompt_subject_index(subjects.len())?];
    println!("\nSelected subject: {}", selected);

    let mut subject = Subject::load(&config.data_dir, selected)?;
    println!("Found {} images", subject.images.len());

    let action = prompt_action(&subject)?;

    println!();
    let token = with_spinner("Authenticating...", || {
        api.authenticate(&config.username, &config.password)
    })?;
    api.set_token(&token);
    println!("✓ Authenticated successfully");

    match action {
        Action::Download => {
            let avatar_id = subject
                .metadata
                .avatar_id
                .clone()
                .context("Subject has no avatar id")?;
            match workflow::download_measurements(&api, &subject, &avatar_id)? {
                FetchOutcome::Saved(_) => {
                    println!("\nMeasurements downloaded for '{}'!", subject.name);
                }
                FetchOutcome::Empty => {
                    println!("\nNo measurements found for '{}' — try again later.", subject.name);
                }
                FetchOutcome::NotReady(state) => {
                    println!(
                        "\nAvatar not ready yet (state: {}). Try again later.",
                        state
                    );
                }
            }
        }
        Action::Upload => {
            workflow::upload_avatar(&api, &mut subject)?;
            println!(
                "\nAvatar '{}' uploaded and processing started!",
                subject.name
            );
        }
    }

    Ok(())
}

/// Read a 1-based subject selection, re-prompting until the input parses
/// as a number within range. Returns the 0-based index.
fn prompt_subject_index(count: usize) -> Result<usize> {
    let choice: usize = Input::new()
        .with_prompt(format!("Select subject (1-{})", count))
        .validate_with(|n: &usize| {
            if (1..=count).contains(n) {
                Ok(())
            } else {
                Err("Invalid choice. Please try again.")
            }
        })
        .interact_text()?;
    Ok(choice - 1)
}

/// Offer the actions valid for this subject: download/re-upload when an
/// avatar id is already recorded, first upload otherwise.
fn prompt_action(subject: &Subject) -> Result<Action> {
    println!("\nWhat would you like to do?");
    if subject.has_avatar_id() {
        let items = vec!["Download measurements", "Re-upload avatar"];
        let selection = Select::new().items(&items).default(0).interact()?;
        Ok(match selection {
            0 => Action::Download,
            _ => Action::Upload,
        })
    } else {
        let items = vec!["Upload avatar (no existing avatar found)"];
        Select::new().items(&items).default(0).interact()?;
        Ok(Action::Upload)
    }
}

/// Run a blocking call with a spinner in front of it.
fn with_spinner<T>(message: &'static str, call: impl FnOnce() -> Result<T>) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = call();
    spinner.finish_and_clear();
    result
}
