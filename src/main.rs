use anyhow::Result;
use clap::{Parser, Subcommand};
use num_format::{Locale, ToFormattedString};
use twitch_probe::{
    auth_server::{open_auth_page, AuthServer},
    config::Credentials,
    twitch::{
        auth::DEFAULT_SCOPES,
        helix::HelixAgent,
        tokens::{AuthAgent, TokenPair},
    },
    TwitchProbeError,
};

#[derive(Parser)]
#[command(version, about = "twitch oauth helper and helix probe")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authorize with twitch in a browser and print the resulting tokens.
    Login {
        /// Scope to request. Repeatable; defaults to what the probe needs.
        #[arg(long = "scope")]
        scopes: Vec<String>,
    },
    /// Trade the stored refresh token for a fresh token pair.
    Refresh,
    /// Check whether the stored access token is still live.
    Validate,
    /// Fetch an app-only token with the client credentials grant.
    AppToken,
    /// Look up a user, their follower count, and their stream status.
    Probe {
        /// Login name to probe. Falls back to TWITCH_USERNAME.
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let credentials = Credentials::load()?;

    match cli.command {
        Command::Login { scopes } => login(credentials, scopes).await,
        Command::Refresh => refresh(credentials).await,
        Command::Validate => validate(credentials).await,
        Command::AppToken => app_token(credentials).await,
        Command::Probe { username } => probe(credentials, username).await,
    }
}

async fn login(credentials: Credentials, scopes: Vec<String>) -> Result<()> {
    let scopes = if scopes.is_empty() {
        DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
    } else {
        scopes
    };

    let server = AuthServer::new(credentials, scopes);
    let auth_page_handle = open_auth_page(server.auth_page_url().clone());

    println!("waiting for twitch to send you back...");
    let pair = server.run().await?;
    auth_page_handle.await?;

    println!("authorized! here's what twitch handed back:");
    print_token_pair(&pair);
    Ok(())
}

async fn refresh(credentials: Credentials) -> Result<()> {
    let agent = AuthAgent::new();
    let pair = agent.refresh(&credentials).await?;

    println!("token refreshed:");
    print_token_pair(&pair);
    Ok(())
}

async fn validate(credentials: Credentials) -> Result<()> {
    let token = credentials.require_access_token()?;
    let agent = AuthAgent::new();

    match agent.validate(token).await? {
        Some(meta) => {
            println!("token is live");
            if let Some(login) = &meta.login {
                println!("  login: {login}");
            }
            if let Some(user_id) = &meta.user_id {
                println!("  user id: {user_id}");
            }
            if !meta.scopes.is_empty() {
                println!("  scopes: {}", meta.scopes.join(" "));
            }
            println!("  expires in: {}s", meta.expires_in);
        }
        None => {
            println!("token is invalid or expired. run `twitch_probe refresh` to get a new one.")
        }
    }
    Ok(())
}

async fn app_token(credentials: Credentials) -> Result<()> {
    let agent = AuthAgent::new();
    let pair = agent.app_access_token(&credentials).await?;

    println!("app access token (no user attached to this one):");
    print_token_pair(&pair);
    Ok(())
}

async fn probe(credentials: Credentials, username: Option<String>) -> Result<()> {
    let Some(username) = username.or_else(|| credentials.username.clone()) else {
        return Err(TwitchProbeError::MissingCredential("TWITCH_USERNAME").into());
    };
    let token = credentials.require_access_token()?.to_string();
    let agent = HelixAgent::new(credentials.client_id.clone(), token);

    let (user, rate) = agent.get_user(&username).await?;
    println!("[/users] rate limit: {rate}");
    let Some(user) = user else {
        println!("no user named {username} over here");
        return Ok(());
    };
    println!("{} ({}, id {})", user.display_name, user.login, user.id);
    if !user.description.is_empty() {
        println!("  \"{}\"", user.description);
    }
    if !user.created_at.is_empty() {
        println!("  around since {}", user.created_at);
    }

    let (followers, rate) = agent.get_follower_count(&user.id).await?;
    println!("[/channels/followers] rate limit: {rate}");
    println!("  {} followers", followers.to_formatted_string(&Locale::en));

    let (stream, rate) = agent.get_stream(&user.id).await?;
    println!("[/streams] rate limit: {rate}");
    match stream {
        Some(stream) => println!(
            "  live playing {} since {}: {} ({} viewers)",
            stream.game_name,
            stream.started_at,
            stream.title,
            stream.viewer_count.to_formatted_string(&Locale::en)
        ),
        None => println!("  not live right now"),
    }

    Ok(())
}

fn print_token_pair(pair: &TokenPair) {
    println!("TWITCH_ACCESS_TOKEN={}", pair.access_token);
    if !pair.refresh_token.is_empty() {
        println!("TWITCH_REFRESH_TOKEN={}", pair.refresh_token);
    }
    println!("# expires in {} seconds", pair.expires_in);
    if !pair.scope.is_empty() {
        println!("# scopes: {}", pair.scope.join(" "));
    }
    println!("copy the lines above into your secrets file to use them");
}
