// Interactive shell
// Reads commands, runs them against the session and profile store

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use std::sync::Arc;

use drf_social_client::auth::{
    redirect_on_auth_status, AuthExpectation, SessionManager, SignInData, SignUpData,
};
use drf_social_client::config::Command;
use drf_social_client::error::{ClientError, FieldErrors};
use drf_social_client::navigation::{routes, History, Navigator};
use drf_social_client::profiles::{Profile, ProfileStore};
use drf_social_client::ui::{NavAction, NavBar};

/// One line typed into the shell
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

pub struct App {
    pub session: Arc<SessionManager>,
    pub profiles: Arc<ProfileStore>,
    pub nav: NavBar,
    pub history: Arc<History>,
}

impl App {
    pub async fn run_shell(&self) -> Result<()> {
        println!("Type `help` for the list of commands.");

        loop {
            let user = self
                .session
                .current_user()
                .map(|u| u.username)
                .unwrap_or_else(|| "anonymous".to_string());

            let line: String = Input::new()
                .with_prompt(format!("{} {}", user, self.history.current()))
                .allow_empty(true)
                .interact_text()
                .context("Failed to read command")?;

            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }

            match ShellLine::try_parse_from(words) {
                Ok(ShellLine {
                    command: Command::Quit,
                }) => break,
                Ok(ShellLine { command }) => {
                    if let Err(e) = self.run(command).await {
                        eprintln!("Error: {:#}", e);
                    }
                }
                Err(e) => {
                    let _ = e.print();
                }
            }
        }

        Ok(())
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Whoami => match self.session.current_user() {
                Some(user) => println!(
                    "{} (user {}, profile {})",
                    user.username, user.pk, user.profile_id
                ),
                None => println!("Not signed in"),
            },
            Command::Login { username } => self.login(username).await?,
            Command::Signup { username } => self.signup(username).await?,
            Command::Logout => {
                if let Some(link) = self
                    .nav
                    .links()
                    .into_iter()
                    .find(|l| l.action == Some(NavAction::SignOut))
                {
                    self.nav.activate(&link).await;
                    println!("Signed out");
                } else {
                    println!("Not signed in");
                }
            }
            Command::Leaderboard => {
                self.profiles.refresh_leaderboard().await?;
                let data = self.profiles.data().await;
                for (rank, profile) in data.popular_profiles.results.iter().enumerate() {
                    println!("{:>3}. {}", rank + 1, describe(profile));
                }
            }
            Command::Profile { id } => {
                let profile = self.profiles.load_page_profile(id).await?;
                self.history.push(&routes::profile(id));
                println!("{}", describe(&profile));
            }
            Command::Follow { id } => {
                let profile = self.profiles.load_page_profile(id).await?;
                self.profiles.follow(&profile).await?;
                println!("{}", describe(&self.page_profile(id).await));
            }
            Command::Unfollow { id } => {
                let profile = self.profiles.load_page_profile(id).await?;
                self.profiles.unfollow(&profile).await?;
                println!("{}", describe(&self.page_profile(id).await));
            }
            Command::Nav => {
                for link in self.nav.links() {
                    println!("{:<10} {}", link.label, link.to);
                }
            }
            Command::Quit => {}
        }

        Ok(())
    }

    async fn login(&self, username: String) -> Result<()> {
        self.history.push(routes::SIGN_IN);
        if redirect_on_auth_status(&self.session, AuthExpectation::LoggedIn).await {
            println!("Already signed in");
            return Ok(());
        }

        let password = Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?;

        match self
            .session
            .login(&SignInData { username, password })
            .await
        {
            Ok(user) => println!("Signed in as {}", user.username),
            Err(ClientError::Validation(fields)) => print_field_errors(&fields),
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn signup(&self, username: String) -> Result<()> {
        self.history.push(routes::SIGN_UP);
        if redirect_on_auth_status(&self.session, AuthExpectation::LoggedIn).await {
            println!("Already signed in");
            return Ok(());
        }

        let password1 = Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?;
        let password2 = Password::new()
            .with_prompt("Confirm password")
            .interact()
            .context("Failed to read password")?;

        let data = SignUpData {
            username,
            password1,
            password2,
        };
        match self.session.register(&data).await {
            Ok(()) => println!("Account created, sign in with `login {}`", data.username),
            Err(ClientError::Validation(fields)) => print_field_errors(&fields),
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn page_profile(&self, id: u64) -> Profile {
        self.profiles
            .data()
            .await
            .page_profile
            .results
            .into_iter()
            .find(|p| p.id == id)
            .unwrap_or_else(|| Profile::new(id, 0, None))
    }
}

fn describe(profile: &Profile) -> String {
    format!(
        "#{} {} - {} followers{}",
        profile.id,
        profile.owner.as_deref().unwrap_or("?"),
        profile.followers_count,
        if profile.following_id.is_some() {
            " (following)"
        } else {
            ""
        }
    )
}

fn print_field_errors(fields: &FieldErrors) {
    for (field, messages) in fields.iter() {
        for message in messages {
            println!("  {}: {}", field, message);
        }
    }
}
