//! Demo content for a fresh database.
use rand::{seq::SliceRandom, Rng};
use tracing::{info, warn};

use crate::{
    error::StoreError,
    models::{DevlogInput, ProjectInput},
    store::Store,
};

const PROJECTS: &[(&str, &str)] = &[
    ("Edge Proxy", "A small reverse proxy that serves static assets from disk and forwards everything else to a loopback app server."),
    ("Devlog Engine", "Markdown devlogs with publication flags, RSS and a project grid."),
    ("Deploy Pipeline", "Ordered, resumable deployment steps with a persisted progress marker."),
    ("Tunnel Playground", "Exposing a home server through an outbound-only encrypted tunnel."),
    ("Static Asset Collector", "Gathers theme files from several source folders into one served directory."),
    ("Service Unit Renderer", "Generates process manager units and tunnel ingress rules from configuration."),
];

const DEVLOGS: &[(&str, &str)] = &[
    ("Serving Static Files Without the App", "Why the proxy owns everything under /static/"),
    ("Forwarded Headers Explained", "X-Forwarded-For, X-Real-IP and friends"),
    ("Binding to Loopback Only", "Keeping the app server off the public interface"),
    ("Immutable Cache Headers", "Long lived caching for fingerprinted assets"),
    ("Resumable Deployments", "Picking up where a failed deploy stopped"),
    ("Writing Idempotent Migrations", "Running the same deploy twice without surprises"),
    ("Tunnel Ingress Rules", "Mapping public hostnames onto a local port"),
    ("Restarting Services Safely", "Ordering restarts so the proxy never points at nothing"),
    ("Sanitizing Markdown", "Allow-lists beat deny-lists"),
    ("An RSS Feed in an Afternoon", "Twenty items, absolute links, done"),
];

const CONTENT: &str = "# Introduction

This devlog covers {topic}.

## The Problem

- Understanding the constraints
- Picking the right tools
- Keeping it maintainable

## The Fix

```sh
just deploy
```

## Takeaways

1. Plan before typing
2. Test early
3. Write it down
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generated {
    pub projects: usize,
    pub devlogs: usize,
}

/// Creates up to `projects` projects and `devlogs` devlogs from the built in
/// templates. The first half of the projects are featured and the last two
/// devlogs stay drafts. Devlogs link to a random project 70% of the time.
pub async fn generate<R: Rng>(
    store: &Store,
    rng: &mut R,
    projects: usize,
    devlogs: usize,
) -> Result<Generated, StoreError> {
    let projects = capped("project", projects, PROJECTS.len());
    let devlogs = capped("devlog", devlogs, DEVLOGS.len());

    let mut created = Vec::with_capacity(projects);
    for (i, (title, description)) in PROJECTS.iter().take(projects).enumerate() {
        let project = store
            .create_project(&ProjectInput {
                title: title.to_string(),
                slug: None,
                description: description.to_string(),
                is_featured: i < projects / 2,
            })
            .await?;

        created.push(project.slug);
    }

    for (i, (title, tagline)) in DEVLOGS.iter().take(devlogs).enumerate() {
        let project = if rng.gen_bool(0.7) {
            created.choose(rng).cloned()
        } else {
            None
        };

        store
            .create_devlog(&DevlogInput {
                title: title.to_string(),
                slug: None,
                tagline: tagline.to_string(),
                content: CONTENT.replace("{topic}", &title.to_lowercase()),
                is_published: i + 2 < devlogs,
                project,
            })
            .await?;
    }

    info!("Generated {projects} project(s) and {devlogs} devlog(s)");

    Ok(Generated { projects, devlogs })
}

fn capped(kind: &str, requested: usize, available: usize) -> usize {
    if requested > available {
        warn!("Only {available} {kind} templates available");
        available
    } else {
        requested
    }
}
