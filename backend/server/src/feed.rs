use content::Devlog;
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};

pub const FEED_LIMIT: i64 = 20;
pub const FEED_DESCRIPTION: &str = "Latest development logs and technical insights";

fn item(base: &str, devlog: &Devlog) -> Item {
    let link = format!("{base}/devlog/{}/", devlog.slug);

    ItemBuilder::default()
        .title(devlog.title.clone())
        .link(link.clone())
        .description(devlog.tagline.clone())
        .guid(GuidBuilder::default().value(link).permalink(true).build())
        .pub_date(devlog.created_at.to_rfc2822())
        .build()
}

/// RSS 2.0 channel for `devlogs`, links made absolute with `base` (`scheme://host`).
pub fn channel(title: &str, base: &str, devlogs: &[Devlog]) -> Channel {
    ChannelBuilder::default()
        .title(title)
        .link(format!("{base}/"))
        .description(FEED_DESCRIPTION)
        .items(devlogs.iter().map(|devlog| item(base, devlog)).collect::<Vec<_>>())
        .build()
}
