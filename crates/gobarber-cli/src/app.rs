//! Application state and page commands.
//!
//! `App` is the composition root of the binary: it loads the config, opens
//! the durable session storage and boots the core. Each command then plays
//! one page of the app: it passes the route guard, calls the API and reports
//! the outcome as a toast.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, Utc};
use tracing::{info, warn};

use gobarber_core::models::{
    disabled_days, is_bookable_weekday, next_appointment, split_by_period, Appointment,
    Credentials, NewUser, ProfileUpdate, ResetPassword, User,
};
use gobarber_core::{AppContext, Config, FileStorage, Page, RouteDecision, SessionError, SessionHandle};

use crate::ui::{self, Toast};

/// A failure that has already been worded for the user.
#[derive(Debug)]
pub struct Reported(pub Toast);

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.title)
    }
}

impl std::error::Error for Reported {}

fn reported(toast: Toast) -> anyhow::Error {
    Reported(toast).into()
}

/// Outcome of walking up to a page through the route guard
enum Entry {
    Allowed,
    Redirected(&'static str),
}

pub struct App {
    context: AppContext,
}

impl App {
    /// Open the session storage and restore any saved session
    pub fn new(config: Config) -> Result<Self> {
        let dir = config.storage_dir()?;
        let storage = FileStorage::new(dir.clone())
            .with_context(|| format!("Failed to open session storage at {}", dir.display()))?;
        let context = AppContext::bootstrap(config, Arc::new(storage))?;
        Ok(Self { context })
    }

    fn session(&self) -> Result<SessionHandle, SessionError> {
        self.context.session()
    }

    fn enter(&self, page: Page) -> Result<Entry> {
        let path = self
            .context
            .routes()
            .for_page(page)
            .map(|route| route.path)
            .ok_or_else(|| anyhow::anyhow!("No route for page {}", page.title()))?;

        match self.context.navigate(path)? {
            RouteDecision::Render(_) => Ok(Entry::Allowed),
            RouteDecision::Redirect { to, from } => {
                info!(from = %from, to, "Route guard redirected");
                Ok(Entry::Redirected(to))
            }
            RouteDecision::NotFound => Err(anyhow::anyhow!("Page not found: {}", path)),
        }
    }

    /// Enter a private page or fail with a sign-in hint
    fn enter_private(&self, page: Page) -> Result<User> {
        match self.enter(page)? {
            Entry::Allowed => self
                .session()?
                .current_user()
                .ok_or_else(|| reported(Toast::error("Not signed in"))),
            Entry::Redirected(_) => Err(reported(
                Toast::error(format!("{} requires a session", page.title()))
                    .with_description("Run `gobarber login` first."),
            )),
        }
    }

    /// Enter a public page that signed-in users are sent away from
    fn enter_public(&self, page: Page) -> Result<()> {
        match self.enter(page)? {
            Entry::Allowed => Ok(()),
            Entry::Redirected(_) => Err(reported(
                Toast::info(format!("Already signed in{}", self.signed_in_as()))
                    .with_description("Run `gobarber logout` to use another account."),
            )),
        }
    }

    fn signed_in_as(&self) -> String {
        self.session()
            .ok()
            .and_then(|session| session.current_user())
            .map(|user| format!(" as {}", user.name))
            .unwrap_or_default()
    }

    // ===== Sign in / out =====

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        if let Entry::Redirected(_) = self.enter(Page::SignIn)? {
            Toast::info(format!("Already signed in{}", self.signed_in_as())).show();
            return Ok(());
        }

        let email = match email {
            Some(email) => email,
            None => prompt_line("Email", self.context.config().last_email.as_deref())?,
        };
        let password = rpassword::prompt_password("Password: ")?;
        if email.is_empty() || password.is_empty() {
            return Err(reported(Toast::error("Email and password required")));
        }

        let session = self.session()?;
        let task = session.spawn_sign_in(Credentials::new(email.clone(), password));
        // Ctrl-C drops the task, which cancels the commit
        let outcome = tokio::select! {
            result = task.wait() => result,
            _ = tokio::signal::ctrl_c() => Err(SessionError::Cancelled),
        };
        if let Err(e) = settle_sign_in(outcome, session.is_session_active()) {
            warn!(error = %e, "Sign-in failed");
            return Err(reported(ui::sign_in_failure(&e)));
        }

        self.context.config_mut().last_email = Some(email);
        if let Err(e) = self.context.config().save() {
            warn!(error = %e, "Failed to save config");
        }

        let name = self
            .session()?
            .current_user()
            .map(|user| user.first_name().to_string())
            .unwrap_or_default();
        Toast::success(format!("Welcome, {}", name)).show();
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        let session = self.session()?;
        if !session.is_session_active() {
            Toast::info("Not signed in").show();
            return Ok(());
        }
        session.sign_out();
        Toast::success("Signed out").show();
        Ok(())
    }

    pub fn whoami(&self) -> Result<()> {
        match self.session()?.current_user() {
            Some(user) => {
                println!("{} <{}>", user.name, user.email);
                if let Some(ref avatar) = user.avatar_url {
                    println!("avatar: {}", avatar);
                }
            }
            None => Toast::info("Not signed in").show(),
        }
        Ok(())
    }

    /// Resolve an arbitrary path through the route guard
    pub fn open(&self, path: &str) -> Result<()> {
        match self.context.navigate(path)? {
            RouteDecision::Render(page) => println!("{} ({})", page.title(), path),
            RouteDecision::Redirect { to, from } => println!("{} -> {}", from, to),
            RouteDecision::NotFound => {
                return Err(reported(Toast::error(format!("No page at {}", path))));
            }
        }
        Ok(())
    }

    // ===== Account pages =====

    pub async fn signup(&self, name: String, email: String) -> Result<()> {
        self.enter_public(Page::SignUp)?;
        let password = rpassword::prompt_password("Password: ")?;

        let new_user = NewUser { name, email, password };
        self.context
            .api()
            .create_user(&new_user)
            .await
            .map_err(|e| reported(ui::request_failure("Sign up failed", &e)))?;

        Toast::success("Account created")
            .with_description("You can now sign in with `gobarber login`.")
            .show();
        Ok(())
    }

    pub async fn forgot_password(&self, email: String) -> Result<()> {
        self.enter_public(Page::ForgotPassword)?;
        self.context
            .api()
            .forgot_password(&email)
            .await
            .map_err(|e| reported(ui::request_failure("Password recovery failed", &e)))?;

        Toast::success("Recovery email sent")
            .with_description("Follow the link in the email to reset your password.")
            .show();
        Ok(())
    }

    /// `link` is the emailed reset link or just its `?token=...` query
    pub async fn reset_password(&self, link: &str) -> Result<()> {
        self.enter_public(Page::ResetPassword)?;
        let query = link.split_once('?').map(|(_, query)| query).unwrap_or(link);

        let password = rpassword::prompt_password("New password: ")?;
        let confirmation = rpassword::prompt_password("Confirm password: ")?;
        let reset = ResetPassword::from_query(query, password, confirmation)
            .map_err(|e| reported(Toast::error("Password reset failed").with_description(e.to_string())))?;

        self.context
            .api()
            .reset_password(&reset)
            .await
            .map_err(|e| reported(ui::request_failure("Password reset failed", &e)))?;

        Toast::success("Password reset")
            .with_description("Sign in with your new password.")
            .show();
        Ok(())
    }

    pub async fn profile(&self, name: Option<String>, email: Option<String>, change_password: bool) -> Result<()> {
        let user = self.enter_private(Page::Profile)?;

        let mut update = ProfileUpdate {
            name: name.unwrap_or(user.name),
            email: email.unwrap_or(user.email),
            ..ProfileUpdate::default()
        };
        if change_password {
            update.old_password = rpassword::prompt_password("Current password: ")?;
            update.password = rpassword::prompt_password("New password: ")?;
            update.password_confirmation = rpassword::prompt_password("Confirm password: ")?;
        }
        update
            .validate()
            .map_err(|e| reported(Toast::error("Profile update failed").with_description(e.to_string())))?;

        let updated = self
            .context
            .api()
            .update_profile(&update)
            .await
            .map_err(|e| reported(ui::request_failure("Profile update failed", &e)))?;
        self.session()?.update_user(updated)?;

        Toast::success("Profile updated").show();
        Ok(())
    }

    pub async fn avatar(&self, file: &Path) -> Result<()> {
        self.enter_private(Page::Profile)?;

        let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("avatar");

        let updated = self
            .context
            .api()
            .update_avatar(file_name, bytes)
            .await
            .map_err(|e| reported(ui::request_failure("Avatar update failed", &e)))?;
        self.session()?.update_user(updated)?;

        Toast::success("Avatar updated").show();
        Ok(())
    }

    // ===== Dashboard =====

    pub async fn appointments(&self, date: Option<NaiveDate>) -> Result<()> {
        let user = self.enter_private(Page::Dashboard)?;
        let today = Local::now().date_naive();
        let date = date.unwrap_or(today);

        let appointments = self
            .context
            .api()
            .fetch_appointments(date)
            .await
            .map_err(|e| reported(ui::request_failure("Could not load appointments", &e)))?;

        println!("Schedule for {} ({})", user.name, date.format("%A, %d %B %Y"));
        if date == today {
            if let Some(next) = next_appointment(&appointments, Utc::now()) {
                println!("\nNext: {} at {}", next.user.name, next.hour_formatted(&Local));
            }
        }

        let (morning, afternoon) = split_by_period(&appointments, &Local);
        print_period("Morning", &morning);
        print_period("Afternoon", &afternoon);
        Ok(())
    }

    pub async fn availability(&self, year: Option<i32>, month: Option<u32>) -> Result<()> {
        let user = self.enter_private(Page::Dashboard)?;
        let today = Local::now().date_naive();
        let year = year.unwrap_or(today.year());
        let month = month.unwrap_or(today.month());

        let items = self
            .context
            .api()
            .fetch_month_availability(&user.id, year, month)
            .await
            .map_err(|e| reported(ui::request_failure("Could not load availability", &e)))?;

        let disabled = disabled_days(&items, year, month);
        if disabled.is_empty() {
            println!("Every day of {:04}-{:02} can be booked", year, month);
        } else {
            println!("Days that cannot be booked in {:04}-{:02}:", year, month);
            for day in disabled {
                let reason = if is_bookable_weekday(day) { "fully booked" } else { "weekend" };
                println!("  {}  {}", day.format("%a %d"), reason);
            }
        }
        Ok(())
    }
}

/// A cancellation that lost the race against the commit is a success
fn settle_sign_in(outcome: Result<(), SessionError>, session_active: bool) -> Result<(), SessionError> {
    match outcome {
        Err(SessionError::Cancelled) if session_active => Ok(()),
        other => other,
    }
}

fn print_period(label: &str, appointments: &[&Appointment]) {
    println!("\n{}", label);
    if appointments.is_empty() {
        println!("  No appointments");
        return;
    }
    for appointment in appointments {
        println!("  {}  {}", appointment.hour_formatted(&Local), appointment.user.name);
    }
}

fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => eprint!("{} [{}]: ", label, value),
        None => eprint!("{}: ", label),
    }
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    Ok(match default {
        Some(value) if line.is_empty() => value.to_string(),
        _ => line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gobarber_core::ApiError;

    #[test]
    fn test_cancel_after_commit_counts_as_signed_in() {
        assert!(settle_sign_in(Err(SessionError::Cancelled), true).is_ok());
    }

    #[test]
    fn test_cancel_before_commit_is_reported() {
        assert!(matches!(
            settle_sign_in(Err(SessionError::Cancelled), false),
            Err(SessionError::Cancelled)
        ));
    }

    #[test]
    fn test_other_failures_pass_through() {
        let outcome = settle_sign_in(Err(SessionError::AuthenticationFailed(ApiError::Unauthorized)), true);
        assert!(matches!(outcome, Err(SessionError::AuthenticationFailed(ApiError::Unauthorized))));
        assert!(settle_sign_in(Ok(()), true).is_ok());
    }
}
