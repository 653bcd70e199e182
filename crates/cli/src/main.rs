//! corvid: operator command-line tool against the Faz service.

mod client;

use clap::Parser;
use client::CawClient;
use corvid_proto::caw as pb;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about = "Caw command-line tool")]
struct Options {
    /// Port of the Faz gRPC service on localhost
    #[arg(long, default_value_t = 50000, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Registers the given username
    #[arg(long)]
    registeruser: Option<String>,

    /// Logs in as the given username
    #[arg(long)]
    user: Option<String>,

    /// Creates a new caw with the given text
    #[arg(long)]
    caw: Option<String>,

    /// Indicates that the new caw is a reply to the given id
    #[arg(long)]
    reply: Option<String>,

    /// Starts following the given username
    #[arg(long)]
    follow: Option<String>,

    /// Reads the caw thread starting at the given id
    #[arg(long)]
    read: Option<String>,

    /// Gets the user's profile of following and followers
    #[arg(long)]
    profile: bool,

    /// Follows caws with the given hashtag as they arrive
    #[arg(long)]
    stream: Option<String>,

    /// Hooks all caw functions to the Faz layer
    #[arg(long = "hook_all")]
    hook_all: bool,

    /// Unhooks all caw functions from the Faz layer
    #[arg(long = "unhook_all")]
    unhook_all: bool,
}

fn validate(options: &Options) -> Result<(), String> {
    if options.user.is_none() {
        if options.follow.is_some() {
            return Err("you need to log in with --user to follow a user".into());
        }
        if options.caw.is_some() {
            return Err("you need to log in with --user to post a caw".into());
        }
        if options.profile {
            return Err("you need to log in with --user to get a profile".into());
        }
    }
    if options.reply.is_some() && options.caw.is_none() {
        return Err("--reply requires --caw".into());
    }
    Ok(())
}

fn print_caw(caw: &pb::Caw) {
    println!("{} [{}]", caw.username, caw.id);
    println!("  {}", caw.text);
    if !caw.parent_id.is_empty() {
        println!("  (reply to {})", caw.parent_id);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = Options::parse();
    validate(&options)?;

    let mut client = CawClient::connect(format!("http://localhost:{}", options.port)).await?;

    if options.hook_all {
        println!("Hooking all caw functions to the Faz layer...");
        client.hook_all().await?;
    }

    if let Some(username) = &options.registeruser {
        client.register_user(username).await?;
        println!("Successfully registered user {}.", username);
    }

    if let Some(to_follow) = &options.follow {
        let user = options.user.as_deref().expect("validated above");
        client.follow(user, to_follow).await?;
        println!("{} is now following {}.", user, to_follow);
    }

    if options.profile {
        let user = options.user.as_deref().expect("validated above");
        let profile = client.profile(user).await?;
        println!("following: {}", profile.following.join(", "));
        println!("followers: {}", profile.followers.join(", "));
    }

    if let Some(text) = &options.caw {
        let user = options.user.as_deref().expect("validated above");
        let parent_id = options.reply.as_deref().unwrap_or("");
        let caw = client.caw(user, text, parent_id).await?;
        print_caw(&caw);
    }

    if let Some(caw_id) = &options.read {
        for caw in client.read(caw_id).await? {
            print_caw(&caw);
        }
    }

    if let Some(tag) = &options.stream {
        let tag = tag.strip_prefix('#').unwrap_or(tag);
        let mut cursor = 0i64;
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        println!("Streaming #{} (Ctrl+C to stop)...", tag);
        loop {
            ticker.tick().await;
            for caw in client.stream(tag, cursor).await? {
                if let Some(ts) = &caw.timestamp {
                    cursor = cursor.max(ts.useconds);
                }
                print_caw(&caw);
            }
        }
    }

    if options.unhook_all {
        println!("Unhooking all caw functions from the Faz layer...");
        client.unhook_all().await?;
    }

    Ok(())
}
