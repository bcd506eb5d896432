//! Plain-text formatting of catalog records for the terminal

use crate::cache::{CacheStats, SweepReport};
use crate::catalog::{Anime, Genre};

/// Longest description shown in the detail view before truncating
const DESCRIPTION_LIMIT: usize = 400;

/// One line per title: id, title, year, rating and badges
pub fn format_anime_line(anime: &Anime) -> String {
    let mut line = format!(
        "{:>7}  {}  ({})  ★ {:.1}",
        anime.id, anime.title, anime.year, anime.rating
    );
    let badges = badges(anime);
    if !badges.is_empty() {
        line.push_str("  [");
        line.push_str(&badges.join(", "));
        line.push(']');
    }
    line
}

/// Multi-line detail view of a single title
pub fn format_anime_detail(anime: &Anime) -> String {
    let mut out = vec![
        format!("{} (#{})", anime.title, anime.id),
        format!("Year: {}    Rating: {:.1}/5    Status: {}", anime.year, anime.rating, anime.status),
    ];
    if let Some(episodes) = anime.episodes {
        out.push(format!("Episodes: {}", episodes));
    }
    if !anime.genres.is_empty() {
        out.push(format!("Genres: {}", anime.genres.join(", ")));
    }
    out.push(format!("Views: {}", anime.views_count));
    if !anime.image_url.is_empty() {
        out.push(format!("Cover: {}", anime.image_url));
    }
    if !anime.banner_url.is_empty() && anime.banner_url != anime.image_url {
        out.push(format!("Banner: {}", anime.banner_url));
    }
    let description = strip_tags(&anime.description);
    if !description.is_empty() {
        out.push(String::new());
        out.push(truncate(&description, DESCRIPTION_LIMIT));
    }
    out.join("\n")
}

pub fn format_genre_line(genre: &Genre) -> String {
    format!("{:<20} {:>6}", genre.name, genre.count)
}

pub fn format_stats(stats: &CacheStats) -> String {
    format!(
        "{} entries ({} fresh, {} expired, {} unreadable)",
        stats.total, stats.fresh, stats.expired, stats.unreadable
    )
}

pub fn format_sweep(report: &SweepReport) -> String {
    let mut line = format!(
        "Removed {} of {} entries",
        report.removed, report.scanned
    );
    if report.failed > 0 {
        line.push_str(&format!(" ({} could not be processed)", report.failed));
    }
    line
}

fn badges(anime: &Anime) -> Vec<&'static str> {
    let mut badges = Vec::new();
    if anime.is_recommended {
        badges.push("recommended");
    }
    if anime.is_trending {
        badges.push("trending");
    }
    if anime.is_popular {
        badges.push("popular");
    }
    badges
}

/// Drops the HTML markup AniList descriptions carry (`<br>`, `<i>`, ...)
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anime() -> Anime {
        Anime {
            id: "21".to_string(),
            title: "One Piece".to_string(),
            description: "Gol D. Roger<br><br>was <i>King</i> of the Pirates.".to_string(),
            image_url: "cover.jpg".to_string(),
            banner_url: "banner.jpg".to_string(),
            rating: 4.4,
            year: 1999,
            genres: vec!["Action".to_string(), "Adventure".to_string()],
            episodes: Some(1100),
            is_recommended: false,
            is_popular: true,
            is_trending: true,
            views_count: 500000,
            status: "RELEASING".to_string(),
        }
    }

    #[test]
    fn test_format_anime_line_includes_badges() {
        let line = format_anime_line(&anime());
        assert!(line.contains("21"));
        assert!(line.contains("One Piece"));
        assert!(line.contains("(1999)"));
        assert!(line.contains("4.4"));
        assert!(line.ends_with("[trending, popular]"));
    }

    #[test]
    fn test_format_anime_line_without_badges() {
        let mut plain = anime();
        plain.is_popular = false;
        plain.is_trending = false;
        assert!(!format_anime_line(&plain).contains('['));
    }

    #[test]
    fn test_format_anime_detail_strips_markup() {
        let detail = format_anime_detail(&anime());
        assert!(detail.starts_with("One Piece (#21)"));
        assert!(detail.contains("Episodes: 1100"));
        assert!(detail.contains("Genres: Action, Adventure"));
        assert!(detail.contains("Banner: banner.jpg"));
        assert!(detail.contains("Gol D. Rogerwas King of the Pirates."));
        assert!(!detail.contains("<br>"));
    }

    #[test]
    fn test_truncate_long_text() {
        let text = "a".repeat(10);
        assert_eq!(truncate(&text, 4), "aaaa…");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_format_stats_and_sweep() {
        let stats = CacheStats {
            total: 3,
            fresh: 1,
            expired: 1,
            unreadable: 1,
        };
        assert_eq!(format_stats(&stats), "3 entries (1 fresh, 1 expired, 1 unreadable)");

        let report = SweepReport {
            scanned: 4,
            removed: 2,
            failed: 1,
        };
        assert_eq!(
            format_sweep(&report),
            "Removed 2 of 4 entries (1 could not be processed)"
        );
    }
}
