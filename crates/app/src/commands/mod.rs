//! Console commands
//!
//! One command per input line. Progress commands mutate the shared session
//! and then save through the orchestrator, so every change is persisted the
//! same way a UI handler would persist it.

use std::str::FromStr;

use chrono::{Local, Utc};
use focusmode_core::{AppState, MysteryReward, ProgressError, SyncAvailability, SyncOutcome};
use focusmode_domain::{
    FocusError, OAuthProvider, Playlist, SignInMethod, Task, TaskDifficulty, View,
};
use serde::Serialize;
use thiserror::Error;

use crate::context::AppContext;
use crate::utils::log_outcome;

pub const HELP: &str = "\
commands:
  status | help | quit
  sign-in anonymous | sign-in email <email> <password>
  sign-in google|github | sign-in token google|github <id-token>
  callback <url> | sign-out | save | retry
  view <name>
  focus <minutes> | distraction | video
  task add [easy|medium|hard] <title> | task done <n> | task remove <n>
  playlist add <name> [url...] | playlist remove <n>
  buy double-points|streak-shield | unlock <track-id> | open-box
  pomodoro <minutes> | notifications on|off";

/// Rejected console command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Sync(#[from] FocusError),
}

fn usage(message: impl Into<String>) -> CommandError {
    CommandError::Usage(message.into())
}

/// Power-ups that can be bought from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUp {
    DoublePoints,
    StreakShield,
}

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Status,
    SignIn(SignInMethod),
    CompleteRedirect(String),
    SignOut,
    Save,
    Retry,
    ShowView(View),
    Focus { minutes: u64 },
    Distraction,
    VideoWatched,
    AddTask { title: String, difficulty: Option<TaskDifficulty> },
    CompleteTask(usize),
    RemoveTask(usize),
    AddPlaylist { name: String, urls: Vec<String> },
    RemovePlaylist(usize),
    Buy(PowerUp),
    Unlock(String),
    OpenMysteryBox,
    Pomodoro(u32),
    Notifications(bool),
}

impl Command {
    /// Whether executing this command changes progress that must be saved.
    pub const fn mutates_progress(&self) -> bool {
        matches!(
            self,
            Self::Focus { .. }
                | Self::Distraction
                | Self::VideoWatched
                | Self::AddTask { .. }
                | Self::CompleteTask(_)
                | Self::RemoveTask(_)
                | Self::AddPlaylist { .. }
                | Self::RemovePlaylist(_)
                | Self::Buy(_)
                | Self::Unlock(_)
                | Self::OpenMysteryBox
                | Self::Pomodoro(_)
                | Self::Notifications(_)
        )
    }
}

fn provider(word: &str) -> Result<OAuthProvider, CommandError> {
    word.parse().map_err(usage)
}

/// Parse a 1-based list position.
fn position(word: Option<&str>) -> Result<usize, CommandError> {
    let word = word.ok_or_else(|| usage("expected a position"))?;
    match word.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(usage(format!("not a position: {word}"))),
    }
}

fn number<T: FromStr>(word: Option<&str>, what: &str) -> Result<T, CommandError> {
    let word = word.ok_or_else(|| usage(format!("expected {what}")))?;
    word.parse().map_err(|_| usage(format!("not a valid {what}: {word}")))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(usage("empty command"));
        };
        let rest: Vec<&str> = words.collect();
        let arg = |i: usize| rest.get(i).copied();

        let command = match (verb.to_ascii_lowercase().as_str(), arg(0)) {
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            ("status", _) => Self::Status,
            ("sign-in", Some("anonymous")) => Self::SignIn(SignInMethod::Anonymous),
            ("sign-in", Some("email")) => match (arg(1), arg(2)) {
                (Some(email), Some(password)) => Self::SignIn(SignInMethod::EmailPassword {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => return Err(usage("sign-in email <email> <password>")),
            },
            ("sign-in", Some("token")) => match (arg(1), arg(2)) {
                (Some(name), Some(id_token)) => Self::SignIn(SignInMethod::IdToken {
                    provider: provider(name)?,
                    id_token: id_token.to_string(),
                }),
                _ => return Err(usage("sign-in token google|github <id-token>")),
            },
            ("sign-in", Some(name)) => Self::SignIn(SignInMethod::OAuth { provider: provider(name)? }),
            ("callback", Some(url)) => Self::CompleteRedirect(url.to_string()),
            ("sign-out", _) => Self::SignOut,
            ("save", _) => Self::Save,
            ("retry", _) => Self::Retry,
            ("view", Some(name)) => Self::ShowView(name.parse().map_err(usage)?),
            ("focus", _) => Self::Focus { minutes: number(arg(0), "number of minutes")? },
            ("distraction", _) => Self::Distraction,
            ("video", _) => Self::VideoWatched,
            ("task", Some("add")) => {
                let (difficulty, title_words) = match arg(1).map(str::parse::<TaskDifficulty>) {
                    Some(Ok(difficulty)) => (Some(difficulty), &rest[2..]),
                    _ => (None, rest.get(1..).unwrap_or_default()),
                };
                Self::AddTask { title: title_words.join(" "), difficulty }
            }
            ("task", Some("done")) => Self::CompleteTask(position(arg(1))?),
            ("task", Some("remove")) => Self::RemoveTask(position(arg(1))?),
            ("playlist", Some("add")) => {
                let name = arg(1).ok_or_else(|| usage("playlist add <name> [url...]"))?;
                let urls = rest.iter().skip(2).map(|url| url.to_string()).collect();
                Self::AddPlaylist { name: name.to_string(), urls }
            }
            ("playlist", Some("remove")) => Self::RemovePlaylist(position(arg(1))?),
            ("buy", Some("double-points")) => Self::Buy(PowerUp::DoublePoints),
            ("buy", Some("streak-shield")) => Self::Buy(PowerUp::StreakShield),
            ("unlock", Some(track)) => Self::Unlock(track.to_string()),
            ("open-box", _) => Self::OpenMysteryBox,
            ("pomodoro", _) => Self::Pomodoro(number(arg(0), "number of minutes")?),
            ("notifications", Some("on")) => Self::Notifications(true),
            ("notifications", Some("off")) => Self::Notifications(false),
            _ => return Err(usage(format!("unknown command: {line}; try `help`"))),
        };
        Ok(command)
    }
}

/// Snapshot printed by `status`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub sync: SyncAvailability,
    pub user_id: Option<String>,
    pub hydrated: bool,
    pub view: Option<String>,
    pub points: u64,
    pub streak_days: u32,
    pub total_focus_minutes: u64,
    pub mystery_boxes: u32,
    pub open_tasks: usize,
    pub unlocked_tracks: Vec<String>,
}

async fn status(ctx: &AppContext) -> StatusReport {
    let session = ctx.orchestrator.session();
    let session = session.read().await;
    let state = &session.state;
    StatusReport {
        sync: ctx.orchestrator.status(),
        user_id: session.user_id().map(str::to_string),
        hydrated: session.hydrated,
        view: ctx.ui.current_view().map(|view| view.to_string()),
        points: state.points,
        streak_days: state.streak_days,
        total_focus_minutes: state.total_focus_time / 60,
        mystery_boxes: state.mystery_box_count,
        open_tasks: state.tasks.iter().filter(|task| !task.completed).count(),
        unlocked_tracks: state
            .premium_lofi_tracks
            .iter()
            .filter(|track| track.unlocked)
            .map(|track| track.id.clone())
            .collect(),
    }
}

fn describe(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Completed => "ok".to_string(),
        SyncOutcome::Deferred => "queued until the backend is ready".to_string(),
        SyncOutcome::Skipped(reason) => format!("skipped ({reason:?})"),
        SyncOutcome::Redirect { url } => {
            format!("open this URL to continue, then run `callback <url>`:\n{url}")
        }
        SyncOutcome::Failed { error, .. } => format!("failed: {error}"),
    }
}

/// Apply a progress command to the in-memory state. Returns a one-line
/// summary.
fn apply_progress(state: &mut AppState, command: Command) -> Result<String, CommandError> {
    let now_ms = Utc::now().timestamp_millis();
    let today = Local::now().date_naive();
    state.expire_power_ups(now_ms);

    let summary = match command {
        Command::Focus { minutes } => {
            let reward = state.record_focus(minutes.saturating_mul(60), today, now_ms)?;
            let mut summary = format!(
                "+{} points, streak {} day(s)",
                reward.points, reward.streak_days
            );
            if reward.mystery_boxes > 0 {
                summary.push_str(", mystery box earned");
            }
            if reward.shield_consumed {
                summary.push_str(", streak shield used");
            }
            summary
        }
        Command::Distraction => {
            state.record_distraction(today);
            format!("{} distraction(s) so far", state.total_distractions)
        }
        Command::VideoWatched => {
            state.record_video_watched();
            format!("{} video(s) watched", state.total_videos_watched)
        }
        Command::AddTask { title, difficulty } => {
            let mut task = Task::new(title);
            task.difficulty = difficulty;
            let index = state.add_task(task)?;
            format!("task {} added", index + 1)
        }
        Command::CompleteTask(index) => {
            format!("+{} points", state.complete_task(index, now_ms)?)
        }
        Command::RemoveTask(index) => format!("removed '{}'", state.remove_task(index)?.title),
        Command::AddPlaylist { name, urls } => {
            let index = state.add_playlist(Playlist::new(name, urls))?;
            format!("playlist {} added", index + 1)
        }
        Command::RemovePlaylist(index) => {
            format!("removed '{}'", state.remove_playlist(index)?.name)
        }
        Command::Buy(PowerUp::DoublePoints) => {
            state.activate_double_points(now_ms)?;
            "double points active".to_string()
        }
        Command::Buy(PowerUp::StreakShield) => {
            state.activate_streak_shield(now_ms)?;
            "streak shield active".to_string()
        }
        Command::Unlock(track) => {
            let cost = state.unlock_track(&track)?;
            format!("unlocked {track} for {cost} points")
        }
        Command::OpenMysteryBox => match state.open_mystery_box(&mut rand::thread_rng(), now_ms)? {
            MysteryReward::Points(points) => format!("+{points} points"),
            MysteryReward::DoublePoints => "double points for an hour".to_string(),
            MysteryReward::StreakShield => "a streak shield".to_string(),
        },
        Command::Pomodoro(minutes) => {
            state.set_pomodoro_duration(minutes)?;
            format!("pomodoro set to {minutes} minutes")
        }
        Command::Notifications(enabled) => {
            state.set_notifications(enabled);
            format!("notifications {}", if enabled { "on" } else { "off" })
        }
        other => return Err(usage(format!("not a progress command: {other:?}"))),
    };
    Ok(summary)
}

/// Run one command against the context. Returns the text to show the user.
pub async fn execute(ctx: &AppContext, command: Command) -> Result<String, CommandError> {
    if command.mutates_progress() {
        let summary = {
            let session = ctx.orchestrator.session();
            let mut session = session.write().await;
            apply_progress(&mut session.state, command)?
        };
        let outcome = ctx.orchestrator.save().await;
        log_outcome("save", &outcome);
        return Ok(match outcome {
            SyncOutcome::Completed => summary,
            other => format!("{summary} (not synced: {})", describe(&other)),
        });
    }

    let outcome = match command {
        Command::Help => return Ok(HELP.to_string()),
        Command::Quit => return Ok("bye".to_string()),
        Command::Status => {
            let report = status(ctx).await;
            return serde_json::to_string_pretty(&report)
                .map_err(|err| CommandError::Sync(err.into()));
        }
        Command::CompleteRedirect(url) => {
            ("complete_redirect", ctx.orchestrator.complete_redirect(url).await)
        }
        Command::SignIn(method) => ("sign_in", ctx.orchestrator.sign_in(method).await),
        Command::SignOut => ("sign_out", ctx.orchestrator.sign_out().await),
        Command::Save => ("save", ctx.orchestrator.save().await),
        Command::Retry => ("bootstrap", ctx.orchestrator.bootstrap().await),
        Command::ShowView(view) => ("set_view", ctx.orchestrator.set_view(view).await),
        other => return Err(usage(format!("unhandled command: {other:?}"))),
    };
    log_outcome(outcome.0, &outcome.1);
    Ok(describe(&outcome.1))
}
