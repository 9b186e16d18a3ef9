use crate::domain::error::BridgeError;
use crate::domain::model::{AvailablePackage, InstalledPackage, LanguagePair};
use crate::domain::traits::PackageRepository;
use crate::infrastructure::config::get_config_path;
use crate::state::AppState;
use chrono::{Local, TimeZone};
use colored::Colorize;
use std::fmt::Write;
use std::path::Path;

pub async fn print_status(state: &AppState, config_path: Option<&Path>) -> Result<(), BridgeError> {
    let repository = state.open_repository().await?;
    let installed = repository.installed_packages().await?;
    let pair = state.config.language_pair()?;

    println!("{}", "mt-bridge Status".green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Data dir: {}", repository.data_dir().display());
    println!(
        "Config: {}",
        config_path
            .map(Path::to_path_buf)
            .or_else(get_config_path)
            .filter(|p| p.exists())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not found (using defaults)".to_string())
    );
    println!(
        "Index: {}",
        state.config.index_url.as_deref().unwrap_or("Not configured")
    );
    println!("Pair: {}", pair.to_string().cyan());
    print!("{}", format_installed(&installed, &pair));
    Ok(())
}

pub async fn print_available(state: &AppState) -> Result<(), BridgeError> {
    let repository = state.open_repository().await?;
    repository.update_package_index().await?;
    let available = repository.available_packages().await?;
    let installed = repository.installed_packages().await?;
    let pair = state.config.language_pair()?;

    print!("{}", format_available(&available, &installed, &pair));
    Ok(())
}

fn format_installed(installed: &[InstalledPackage], pair: &LanguagePair) -> String {
    let mut output = String::new();
    if installed.is_empty() {
        writeln!(output, "Installed: {}", "none".yellow()).ok();
        return output;
    }

    writeln!(output, "Installed:").ok();
    for package in installed {
        let meta = &package.metadata;
        let label = format!("{} -> {}", meta.from_code, meta.to_code);
        let label = if meta.serves(pair) {
            label.green().bold().to_string()
        } else {
            label
        };
        let installed_at = meta
            .installed_at
            .and_then(|ts| Local.timestamp_opt(ts, 0).single())
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            output,
            "  {}  v{}  {}  {}",
            label,
            meta.package_version.as_deref().unwrap_or("?"),
            installed_at.dimmed(),
            package.path.display()
        )
        .ok();
    }
    output
}

fn format_available(
    available: &[AvailablePackage],
    installed: &[InstalledPackage],
    pair: &LanguagePair,
) -> String {
    let mut output = String::new();
    if available.is_empty() {
        writeln!(output, "{}", "No packages in index".yellow()).ok();
        return output;
    }

    for package in available {
        let is_installed = installed.iter().any(|p| {
            p.metadata.from_code == package.from_code && p.metadata.to_code == package.to_code
        });
        let marker = if is_installed { "✔".green().to_string() } else { " ".to_string() };
        let names = match (&package.from_name, &package.to_name) {
            (Some(from), Some(to)) => format!(" ({} → {})", from, to),
            _ => String::new(),
        };
        let line = format!(
            "{} {} -> {}{}  v{}",
            marker,
            package.from_code,
            package.to_code,
            names,
            package.package_version.as_deref().unwrap_or("?")
        );
        if package.serves(pair) {
            writeln!(output, "{}", line.bold()).ok();
        } else {
            writeln!(output, "{}", line).ok();
        }
    }
    output
}
