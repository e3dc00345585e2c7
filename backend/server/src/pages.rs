//! Server rendered HTML. Every piece of stored text goes through [`escape`]
//! except devlog bodies, which are already sanitized markdown output.
use std::fmt::Write;

use content::{Devlog, Project, ProjectCard};

use crate::utils::escape;

/// Site wide values every page needs.
#[derive(Clone, Copy)]
pub struct Site<'a> {
    pub title: &'a str,
    pub static_url: &'a str,
}

pub fn layout(site: Site, title: &str, body: &str) -> String {
    let heading = if title.is_empty() {
        escape(site.title)
    } else {
        format!("{} | {}", escape(title), escape(site.title))
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{heading}</title>
<link rel="stylesheet" href="{assets}css/styles.css">
<link rel="alternate" type="application/rss+xml" title="{name}" href="/rss/">
</head>
<body>
<header class="site-header">
<a class="brand" href="/">{name}</a>
<nav><a href="/">Home</a> <a href="/explore/">Explore</a> <a href="/rss/">RSS</a></nav>
</header>
<main>
{body}
</main>
<script src="{assets}js/theme.js" defer></script>
</body>
</html>
"#,
        name = escape(site.title),
        assets = escape(site.static_url),
    )
}

pub fn home(site: Site, devlogs: &[Devlog], projects: &[Project]) -> String {
    let mut body = String::from("<section class=\"latest\">\n<h1>Latest devlogs</h1>\n");

    if devlogs.is_empty() {
        body.push_str("<p class=\"empty\">No devlogs yet.</p>\n");
    }
    for devlog in devlogs {
        body.push_str(&devlog_card(devlog));
    }

    body.push_str("</section>\n<section class=\"featured\">\n<h2>Featured projects</h2>\n");
    for project in projects {
        body.push_str(&project_card(project));
    }
    body.push_str("</section>\n");

    layout(site, "", &body)
}

pub fn devlog(site: Site, devlog: &Devlog, html: &str, project: Option<&Project>) -> String {
    let mut body = format!(
        "<article class=\"devlog\">\n<h1>{}</h1>\n<p class=\"tagline\">{}</p>\n<time datetime=\"{}\">{}</time>\n",
        escape(&devlog.title),
        escape(&devlog.tagline),
        devlog.created_at.to_rfc3339(),
        devlog.created_at.format("%B %-d, %Y"),
    );

    if let Some(project) = project {
        let _ = writeln!(
            body,
            "<p class=\"project-link\">Part of <a href=\"/project/{}/\">{}</a></p>",
            escape(&project.slug),
            escape(&project.title),
        );
    }

    let _ = write!(body, "<div class=\"content\">\n{html}\n</div>\n</article>\n");

    layout(site, &devlog.title, &body)
}

pub fn project(site: Site, project: &Project, devlogs: &[Devlog]) -> String {
    let mut body = format!(
        "<article class=\"project\">\n<h1>{}</h1>\n<p class=\"description\">{}</p>\n<h2>Devlogs</h2>\n",
        escape(&project.title),
        escape(&project.description),
    );

    if devlogs.is_empty() {
        body.push_str("<p class=\"empty\">No devlogs for this project yet.</p>\n");
    }
    for devlog in devlogs {
        body.push_str(&devlog_card(devlog));
    }
    body.push_str("</article>\n");

    layout(site, &project.title, &body)
}

pub fn explore(site: Site, cards: &[ProjectCard], query: Option<&str>) -> String {
    let query = query.unwrap_or_default();

    let mut body = format!(
        "<h1>Explore</h1>\n<form class=\"search\" method=\"get\" action=\"/explore/\">\n\
         <input type=\"search\" name=\"q\" value=\"{}\" placeholder=\"Search projects and devlogs\">\n\
         <button type=\"submit\">Search</button>\n</form>\n<div class=\"grid\">\n",
        escape(query),
    );

    if cards.is_empty() {
        body.push_str("<p class=\"empty\">Nothing matches.</p>\n");
    }

    for card in cards {
        let _ = write!(
            body,
            "<section class=\"card\">\n<h2><a href=\"/project/{}/\">{}</a></h2>\n<p>{}</p>\n<ul>\n",
            escape(&card.project.slug),
            escape(&card.project.title),
            escape(&card.project.description),
        );
        for devlog in &card.devlogs {
            let _ = writeln!(
                body,
                "<li><a href=\"/devlog/{}/\">{}</a></li>",
                escape(&devlog.slug),
                escape(&devlog.title),
            );
        }
        body.push_str("</ul>\n</section>\n");
    }
    body.push_str("</div>\n");

    layout(site, "Explore", &body)
}

pub fn login(site: Site, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
        .unwrap_or_default();

    let body = format!(
        "<h1>Admin login</h1>\n{error}<form method=\"post\" action=\"/admin/login/\">\n\
         <label>Username <input name=\"username\" autocomplete=\"username\" required></label>\n\
         <label>Password <input name=\"password\" type=\"password\" autocomplete=\"current-password\" required></label>\n\
         <button type=\"submit\">Log in</button>\n</form>\n"
    );

    layout(site, "Log in", &body)
}

/// Standalone, it is rendered from error paths without settings at hand.
pub fn not_found() -> String {
    "<!DOCTYPE html>\n<html lang=\"en\">\n<head><title>Not Found</title></head>\n<body>\n\
     <h1>Not Found</h1>\n<p>The requested resource was not found on this server.</p>\n</body>\n</html>\n"
        .to_string()
}

fn devlog_card(devlog: &Devlog) -> String {
    format!(
        "<article class=\"devlog-card\">\n<h3><a href=\"/devlog/{}/\">{}</a></h3>\n<p>{}</p>\n</article>\n",
        escape(&devlog.slug),
        escape(&devlog.title),
        escape(&devlog.tagline),
    )
}

fn project_card(project: &Project) -> String {
    format!(
        "<article class=\"project-card\">\n<h3><a href=\"/project/{}/\">{}</a></h3>\n<p>{}</p>\n</article>\n",
        escape(&project.slug),
        escape(&project.title),
        escape(&project.description),
    )
}
