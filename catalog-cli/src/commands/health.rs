use std::collections::HashMap;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadinessResponse {
    ready: bool,
    #[serde(default)]
    dependencies: HashMap<String, DependencyStatus>,
}

#[derive(Debug, Deserialize)]
struct DependencyStatus {
    healthy: bool,
    #[serde(default)]
    message: Option<String>,
}

pub async fn execute(verbose: bool, url: String) -> Result<()> {
    println!("{}", "Checking service health...".bold());
    println!();

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .context("Failed to create HTTP client")?;
    let base_url = url.trim_end_matches('/');

    let health_url = format!("{}/health", base_url);
    print!("Health endpoint ({})... ", health_url);

    match fetch::<HealthResponse>(&client, &health_url, verbose).await {
        Ok((_, response)) => {
            println!("{}", "✓ OK".green().bold());
            if verbose {
                println!("  Status: {}", response.status);
                if let Some(version) = response.version {
                    println!("  Version: {}", version);
                }
            }
        }
        Err(e) => {
            println!("{}", "✗ FAILED".red().bold());
            println!("  Error: {}", e);
            return Err(e);
        }
    }

    let ready_url = format!("{}/ready", base_url);
    print!("Readiness endpoint ({})... ", ready_url);

    // 503 still carries the dependency report
    let (status, readiness) = match fetch::<ReadinessResponse>(&client, &ready_url, verbose).await {
        Ok(result) => result,
        Err(e) => {
            println!("{}", "✗ FAILED".red().bold());
            println!("  Error: {}", e);
            return Err(e);
        }
    };

    if readiness.ready {
        println!("{}", "✓ OK".green().bold());
    } else {
        println!("{}", "✗ NOT READY".red().bold());
    }
    if verbose || !readiness.ready {
        let mut names: Vec<_> = readiness.dependencies.keys().collect();
        names.sort();
        for name in names {
            let dependency = &readiness.dependencies[name];
            let mark = if dependency.healthy { "✓".green() } else { "✗".red() };
            let message = dependency.message.as_deref().unwrap_or("");
            println!("  {} {} {}", mark, name, message.dimmed());
        }
    }

    if !readiness.ready {
        anyhow::bail!("Service is not ready (HTTP {})", status.as_u16());
    }

    println!();
    println!("{}", "Service is healthy and ready!".green().bold());

    Ok(())
}

async fn fetch<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    verbose: bool,
) -> Result<(reqwest::StatusCode, T)> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to send request")?;

    let status = response.status();

    if verbose {
        println!();
        println!("  HTTP Status: {}", status);
    }

    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    if verbose {
        println!("  Response: {}", body);
    }

    match serde_json::from_str::<T>(&body) {
        Ok(parsed) => Ok((status, parsed)),
        Err(_) if !status.is_success() => anyhow::bail!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
        Err(e) => Err(e).with_context(|| format!("Unexpected response format: {}", body)),
    }
}
