//! Extract subtitles from a remote MKV and print a summary.
//!
//! ```sh
//! cargo run --example extract -- https://example.com/video.mkv
//! ```

use subgrab::{extract_subtitles, ExtractOptions};

#[tokio::main]
async fn main() -> subgrab::Result<()> {
    let url = std::env::args()
        .nth(1)
        .expect("usage: extract <url> [language...]");
    let languages: Vec<String> = std::env::args().skip(2).collect();

    let mut options = ExtractOptions::new().concurrency(4);
    if !languages.is_empty() {
        options = options.languages(languages);
    }

    for track in extract_subtitles(&url, options).await? {
        println!(
            "track {} [{}] lang={} name={}: {} bytes{}",
            track.track_number,
            track.format,
            track.language.as_deref().unwrap_or("-"),
            track.track_name.as_deref().unwrap_or("-"),
            track.subtitle.len(),
            match &track.fonts {
                Some(fonts) => format!(", {} font(s)", fonts.len()),
                None => String::new(),
            }
        );
    }
    Ok(())
}
