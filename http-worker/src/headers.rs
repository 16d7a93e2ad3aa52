use rand::Rng;
use rand::seq::IndexedRandom;

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

pub const REFERERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://duckduckgo.com/",
    "https://www.facebook.com/",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS.choose(&mut rand::rng()).copied().unwrap_or(USER_AGENTS[0])
}

pub fn random_referer() -> &'static str {
    REFERERS.choose(&mut rand::rng()).copied().unwrap_or(REFERERS[0])
}

pub fn random_ipv4() -> String {
    let mut rng = rand::rng();
    format!(
        "{}.{}.{}.{}",
        rng.random_range(1..=254),
        rng.random_range(0..=255),
        rng.random_range(0..=255),
        rng.random_range(1..=254)
    )
}

/// The three header-sets `HTTP_BYPASS` rotates through, carried over from
/// the original module: a browser posing behind spoofed proxy headers, a
/// fake Googlebot crawler, and a mobile Safari client.
pub fn bypass_header_set(index: usize) -> Vec<(&'static str, String)> {
    match index % 3 {
        0 => vec![
            ("User-Agent", USER_AGENTS[0].to_string()),
            ("X-Forwarded-For", random_ipv4()),
            ("X-Real-IP", random_ipv4()),
            ("X-Remote-Addr", random_ipv4()),
            ("X-Remote-IP", random_ipv4()),
            ("X-Client-IP", random_ipv4()),
        ],
        1 => vec![
            (
                "User-Agent",
                "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
                    .to_string(),
            ),
            ("X-Forwarded-For", random_ipv4()),
        ],
        _ => vec![
            ("User-Agent", USER_AGENTS[3].to_string()),
            ("X-Forwarded-For", random_ipv4()),
            ("X-Real-IP", random_ipv4()),
        ],
    }
}
