//! roster: command-line front end for the records service
//!
//! Signs in against the records API, keeps the session pair in a local JSON
//! file and drives the dashboard and activity views from the terminal.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use roster_sync::models::{Activity, LoginRequest, RegistrationForm};
use roster_sync::{
    ActivityList, ClientConfig, Confirm, Dashboard, FileStorage, GuardDecision, HttpGateway, MutationOutcome,
    NoticeLevel, Notification, Notifier, RecordApi, Route, SessionStore,
};

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Records client for groups, students, activities and progress")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "roster.toml")]
    config: String,

    /// Records API base URL (overrides config file)
    #[arg(long, env = "ROSTER_API_URL")]
    api_url: Option<String>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and persist the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ROSTER_PASSWORD")]
        password: String,
    },
    /// Create an account and sign in with it
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Forget the persisted session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Load and summarize the dashboard
    Dashboard,
    /// List activities
    Activities {
        /// Only activities assigned to this student
        #[arg(long)]
        student: Option<String>,
    },
    /// Mark an activity as completed
    Complete { id: String },
    /// Mark an activity as pending again
    Reopen { id: String },
    /// Delete an activity
    Delete { id: String },
}

/// Prints notifications to stderr with the configured lifetimes
struct ConsoleNotifier {
    success_ms: u64,
    error_ms: u64,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let notification = match notification.level {
            NoticeLevel::Success => notification.with_duration(self.success_ms),
            NoticeLevel::Error => notification.with_duration(self.error_ms),
        };
        debug!(duration_ms = notification.duration_ms, "notification");
        match notification.level {
            NoticeLevel::Success => eprintln!("ok: {}", notification.message),
            NoticeLevel::Error => eprintln!("error: {}", notification.message),
        }
    }
}

/// Yes/no prompt on the terminal
struct StdinConfirm {
    assume_yes: bool,
}

#[async_trait]
impl Confirm for StdinConfirm {
    async fn request_confirmation(&self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = format!("{}: {} [y/N] ", title, message);
        tokio::task::spawn_blocking(move || {
            use std::io::Write;

            eprint!("{}", prompt);
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
                Err(_) => false,
            }
        })
        .await
        .unwrap_or(false)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roster_sync=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load(&cli.config)?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }

    let session_file = config.session_path();
    info!(api_url = %config.api_url, session = %session_file.display(), "roster starting");

    let storage = Arc::new(FileStorage::new(session_file));
    let gateway = Arc::new(HttpGateway::new(&config)?.with_session(storage.clone()));
    let session = SessionStore::new(gateway.clone(), storage);
    session.initialize();

    let api = RecordApi::new(gateway);
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier {
        success_ms: config.success_notice_ms,
        error_ms: config.error_notice_ms,
    });
    let confirm: Arc<dyn Confirm> = Arc::new(StdinConfirm { assume_yes: cli.yes });

    match cli.command {
        Command::Login { email, password } => {
            let response = session
                .login(&LoginRequest::new(email, password))
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("Signed in as {} <{}>", response.user.display_name, response.user.email);
        }
        Command::Register {
            name,
            email,
            password,
            confirm_password,
            role,
        } => {
            let form = RegistrationForm {
                name,
                email,
                password,
                confirm_password,
                role,
            };
            if !form.passwords_match() {
                bail!("Passwords do not match");
            }
            let response = session
                .register(&form.into_request())
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("Registered {} <{}>", response.user.display_name, response.user.email);
        }
        Command::Logout => {
            session.logout().map_err(|e| anyhow!(e.user_message()))?;
            println!("Signed out");
        }
        Command::Whoami => match session.current_principal() {
            Some(user) => println!("{} <{}> ({})", user.display_name, user.email, user.role),
            None => println!("Not signed in"),
        },
        Command::Dashboard => {
            require(&session, Route::Dashboard)?;
            let dashboard = Dashboard::new(api, confirm, notifier);
            dashboard.load();
            dashboard.ready().await;
            print_dashboard(&dashboard);
        }
        Command::Activities { student } => {
            require(&session, Route::Activities)?;
            let list = ActivityList::new(api, confirm, notifier);
            list.load();
            list.ready().await;
            list.filter_by_student(student);
            for activity in list.rows() {
                print_activity(&activity);
            }
        }
        Command::Complete { id } => {
            require(&session, Route::Activities)?;
            let activity = api.get_activity(&id).await.map_err(|e| anyhow!(e.user_message()))?;
            let list = ActivityList::new(api, confirm, notifier);
            report(list.complete(&activity).await)?;
            list.ready().await;
        }
        Command::Reopen { id } => {
            require(&session, Route::Activities)?;
            let activity = api.get_activity(&id).await.map_err(|e| anyhow!(e.user_message()))?;
            let list = ActivityList::new(api, confirm, notifier);
            report(list.reopen(&activity).await)?;
            list.ready().await;
        }
        Command::Delete { id } => {
            require(&session, Route::Activities)?;
            let activity = api.get_activity(&id).await.map_err(|e| anyhow!(e.user_message()))?;
            let list = ActivityList::new(api, confirm, notifier);
            report(list.delete(&activity).await)?;
            list.ready().await;
        }
    }

    Ok(())
}

fn require(session: &SessionStore, route: Route) -> anyhow::Result<()> {
    match session.guard(route) {
        GuardDecision::Allow => Ok(()),
        GuardDecision::Redirect(to) => bail!("Not signed in; run `roster login` ({})", to.path()),
    }
}

fn report<R>(outcome: MutationOutcome<R>) -> anyhow::Result<()> {
    match outcome {
        MutationOutcome::Applied(_) => Ok(()),
        MutationOutcome::Declined => {
            println!("Cancelled");
            Ok(())
        }
        MutationOutcome::Failed(e) => Err(anyhow!(e.user_message())),
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    let stats = dashboard.progress_stats();
    let groups = dashboard.groups().with(|g| g.map_or(0, |g| g.len()));
    let students = dashboard.students().with(|s| s.map_or(0, |s| s.len()));
    let activities = dashboard.activities().with(|a| a.map_or(0, |a| a.len()));

    println!("Groups:      {} ({} active)", groups, dashboard.active_groups().len());
    println!(
        "Students:    {} ({} with special needs)",
        students,
        dashboard.students_with_special_needs().len()
    );
    println!(
        "Activities:  {} ({} completed)",
        activities,
        dashboard.completed_activities().len()
    );
    println!(
        "Progress:    {} achieved, {} in progress, {} not achieved ({}% achievement)",
        stats.achieved,
        stats.in_progress,
        stats.not_achieved,
        dashboard.achievement_rate()
    );

    println!("\nRecent students:");
    for student in dashboard.recent_students() {
        println!("  {}  {}", student.id, student.name);
    }

    println!("\nPending activities:");
    for activity in dashboard.pending_activities() {
        print_activity(&activity);
    }
}

fn print_activity(activity: &Activity) {
    println!(
        "  {}  [{}]  {}  ({})",
        activity.id,
        activity.status,
        activity.title,
        activity.student_name.as_deref().unwrap_or(&activity.student_id)
    );
}
