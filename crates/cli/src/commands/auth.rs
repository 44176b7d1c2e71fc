use anyhow::Result;
use clap::Subcommand;

use super::context;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an account
    SignUp {
        email: String,
        password: String,
    },
    /// Sign in and persist the session
    SignIn {
        email: String,
        password: String,
    },
    /// Sign out and drop the persisted session
    SignOut,
    /// Show the signed-in user
    Whoami,
}

pub async fn run(action: AuthAction) -> Result<()> {
    let ctx = context()?;

    match action {
        AuthAction::SignUp { email, password } => {
            match ctx.auth.sign_up(&email, &password).await? {
                Some(session) => {
                    println!("signed up and signed in as {}", session.user.id);
                }
                None => {
                    println!("signed up; confirm the address via the email you received");
                }
            }
        }
        AuthAction::SignIn { email, password } => {
            let session = ctx.auth.sign_in(&email, &password).await?;
            println!(
                "signed in as {} ({})",
                session.user.email.as_deref().unwrap_or("-"),
                session.user.id
            );
        }
        AuthAction::SignOut => {
            ctx.auth.sign_out().await?;
            println!("signed out");
        }
        AuthAction::Whoami => match ctx.auth.current_user().await? {
            Some(user) => {
                println!("{} ({})", user.email.as_deref().unwrap_or("-"), user.id);
            }
            None => println!("not signed in"),
        },
    }

    Ok(())
}
