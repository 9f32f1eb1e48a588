//! Entry point for the sitepulse TUI. Parses args, resolves a profile and runs the App.

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use sitepulse::api::ApiClient;
use sitepulse::app::{App, Endpoints};
use sitepulse::history::DEFAULT_CAPACITY;
use sitepulse::logging;
use sitepulse::profiles::{
    load_profiles, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile,
};
use sitepulse::state::{ClientClock, HealthState, CLOCK_TICK, HEALTH_POLL_INTERVAL};
use sitepulse::ws::stream_url;
use tracing::{info, warn};

const API_KEY_ENV: &str = "SITEPULSE_API_KEY";

#[derive(Debug, Default, PartialEq, Eq)]
struct ParsedArgs {
    api_base: Option<String>,
    api_key: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    save: bool,
    dry_run: bool,
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--api-key KEY|-k KEY] [--tls-ca CERT_PEM|-t CERT_PEM] [--profile NAME|-P NAME] [--save] [--dry-run] [--api URL|-a URL | http(s)://HOST[:PORT][/BASE]]"
    )
}

// `--flag=value` form
fn inline_value(arg: &str) -> Option<String> {
    arg.split_once('=')
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "sitepulse".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--api" | "-a" => parsed.api_base = it.next(),
            "--api-key" | "-k" => parsed.api_key = it.next(),
            "--tls-ca" | "-t" => parsed.tls_ca = it.next(),
            "--profile" | "-P" => parsed.profile = it.next(),
            "--save" => parsed.save = true,
            "--dry-run" => parsed.dry_run = true,
            _ if arg.starts_with("--api=") => parsed.api_base = inline_value(&arg),
            _ if arg.starts_with("--api-key=") => parsed.api_key = inline_value(&arg),
            _ if arg.starts_with("--tls-ca=") => parsed.tls_ca = inline_value(&arg),
            _ if arg.starts_with("--profile=") => parsed.profile = inline_value(&arg),
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown flag '{arg}'. {}", usage(&prog)));
            }
            _ => {
                if parsed.api_base.is_none() {
                    parsed.api_base = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {}", usage(&prog)));
                }
            }
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    if let Some(path) = logging::init() {
        info!(log = %path.display(), "sitepulse starting");
    }

    let Some(entry) = resolve_entry(&parsed)? else {
        return Ok(());
    };

    let api_key = entry
        .api_key
        .clone()
        .or_else(|| env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()));
    let endpoints = Endpoints {
        stream_url: stream_url(&entry.api_base)?.to_string(),
        api_base: entry.api_base,
        api_key,
        tls_ca: entry.tls_ca,
    };

    if parsed.dry_run {
        println!("api: {}", endpoints.api_base);
        println!("stream: {}", endpoints.stream_url);
        return Ok(());
    }

    let client = ApiClient::new(&endpoints.api_base, endpoints.api_key.clone())?;
    let health = Arc::new(HealthState::new());
    let clock = Arc::new(ClientClock::new());
    let poller = health.spawn_poller(client, HEALTH_POLL_INTERVAL);
    let ticker = clock.spawn_ticker(CLOCK_TICK);

    let mut app = App::new(health.clone(), &clock, DEFAULT_CAPACITY);
    let res = app.run(&endpoints).await;

    poller.abort();
    ticker.abort();
    res
}

fn resolve_entry(parsed: &ParsedArgs) -> anyhow::Result<Option<ProfileEntry>> {
    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        api_base: parsed.api_base.clone(),
        api_key: parsed.api_key.clone(),
        tls_ca: parsed.tls_ca.clone(),
    };

    let mut profiles_mut = profiles_file.clone();
    let entry = match req.resolve(&profiles_file) {
        ResolveProfile::Direct(entry) => {
            // Possibly save if profile specified and --save or new entry
            if let Some(name) = parsed.profile.as_ref() {
                let overwrite = match profiles_mut.profiles.get(name) {
                    // New profile: auto-save immediately
                    None => true,
                    Some(existing) if *existing == entry => false,
                    Some(_) => {
                        parsed.save
                            || prompt_yes_no(&format!(
                                "Overwrite existing profile '{name}'? [y/N]: "
                            ))
                    }
                };
                if overwrite {
                    profiles_mut.profiles.insert(name.clone(), entry.clone());
                    if let Err(e) = save_profiles(&profiles_mut) {
                        warn!(error = %e, "could not save profile");
                    }
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| (1..=names.len()).contains(idx))
                .and_then(|idx| profiles_mut.profiles.get(&names[idx - 1]).cloned());
            match picked {
                Some(entry) => entry,
                None => return Ok(None),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let api_base = prompt_string("Enter API base URL (http(s)://HOST[:PORT][/BASE]): ")?;
            if api_base.trim().is_empty() {
                return Ok(None);
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let entry = ProfileEntry {
                api_base: api_base.trim().to_string(),
                api_key: parsed.api_key.clone(),
                tls_ca: Some(ca.trim().to_string()).filter(|s| !s.is_empty()),
            };
            profiles_mut.profiles.insert(name, entry.clone());
            if let Err(e) = save_profiles(&profiles_mut) {
                warn!(error = %e, "could not save profile");
            }
            entry
        }
        ResolveProfile::None => {
            eprintln!("No API URL provided and no profiles to select.");
            return Ok(None);
        }
    };
    Ok(Some(entry))
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("sitepulse")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn short_long_and_inline_flags() {
        let p = parse_args(args(&[
            "-k",
            "secret",
            "--tls-ca=/tmp/ca.pem",
            "-P",
            "prod",
            "--save",
            "http://localhost:8080",
        ]))
        .unwrap();
        assert_eq!(
            p,
            ParsedArgs {
                api_base: Some("http://localhost:8080".into()),
                api_key: Some("secret".into()),
                tls_ca: Some("/tmp/ca.pem".into()),
                profile: Some("prod".into()),
                save: true,
                dry_run: false,
            }
        );
        let p = parse_args(args(&["--api", "https://blog.example.com", "--dry-run"])).unwrap();
        assert_eq!(p.api_base.as_deref(), Some("https://blog.example.com"));
        assert!(p.dry_run);
    }

    #[test]
    fn help_and_errors() {
        assert!(parse_args(args(&["--help"])).unwrap_err().starts_with("Usage:"));
        assert!(parse_args(args(&["http://a", "http://b"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
    }
}
