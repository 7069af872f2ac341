//! Self-contained HTML player page
//!
//! Playlists are attached through hls.js where Media Source Extensions are
//! available, falling back to native HLS; progressive files use a plain
//! `<video src>`.

use crate::models::{StreamDescriptor, SubtitleKind};

const HLS_JS_URL: &str = "https://cdn.jsdelivr.net/npm/hls.js@latest";

/// Render the player page for a resolved descriptor
pub fn render(descriptor: &StreamDescriptor, language: &str, autoplay: bool) -> String {
    let title = format!("Z-Anime Player - Episode {}", descriptor.episode_number);
    let subtitle = format!(
        "{} · {} · {}",
        descriptor.content_id,
        descriptor.server.to_uppercase(),
        language.to_uppercase()
    );

    let body = match descriptor.primary() {
        Some(source) => {
            let config = serde_json::json!({
                "url": source.url,
                "playlist": source.media_kind.is_playlist(),
                "autoplay": autoplay,
            });
            let tracks: String = descriptor
                .subtitle_tracks
                .iter()
                .map(|t| {
                    format!(
                        r#"<track kind="{}" label="{}" src="{}">"#,
                        match t.kind {
                            SubtitleKind::Captions => "captions",
                            SubtitleKind::Subtitles => "subtitles",
                        },
                        escape_html(&t.label),
                        escape_html(&t.url)
                    )
                })
                .collect();

            format!(
                r#"<video id="player" controls playsinline{autoplay}>{tracks}</video>
    <script src="{hls}"></script>
    <script>
      const config = {config};
      const video = document.getElementById("player");
      if (config.playlist && window.Hls && Hls.isSupported()) {{
        const hls = new Hls();
        hls.loadSource(config.url);
        hls.attachMedia(video);
      }} else {{
        video.src = config.url;
      }}
      if (config.autoplay) {{
        video.play().catch(() => {{}});
      }}
    </script>"#,
                autoplay = if autoplay { " autoplay" } else { "" },
                tracks = tracks,
                hls = HLS_JS_URL,
                config = script_safe_json(&config),
            )
        }
        None => r#"<p class="empty">No playable sources found.</p>"#.to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    * {{ margin: 0; padding: 0; box-sizing: border-box; }}
    body {{ background: #000; color: #eee; font-family: Arial, sans-serif; }}
    header {{ position: absolute; top: 0; left: 0; padding: 12px 16px; font-size: 14px; opacity: 0.8; }}
    video {{ width: 100vw; height: 100vh; object-fit: contain; background: #000; }}
    .empty {{ padding: 48px; text-align: center; }}
  </style>
</head>
<body>
  <header>{title_text} · {subtitle}{fallback}</header>
  {body}
</body>
</html>
"#,
        title = escape_html(&title),
        title_text = escape_html(&title),
        subtitle = escape_html(&subtitle),
        fallback = if descriptor.is_fallback { " · test stream" } else { "" },
        body = body,
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that cannot terminate the surrounding `<script>` element
fn script_safe_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogIdKind, StreamSource};
    use chrono::Utc;

    fn descriptor(sources: Vec<StreamSource>) -> StreamDescriptor {
        StreamDescriptor {
            content_id: "21".to_string(),
            id_kind: CatalogIdKind::External,
            episode_number: 3,
            server: "vidcloud".to_string(),
            audio_track: "sub".to_string(),
            language: None,
            sources,
            subtitle_tracks: Vec::new(),
            intro: None,
            outro: None,
            is_fallback: false,
            message: None,
            resolved_from: None,
            attempts: Vec::new(),
            resolved_at: Utc::now(),
        }
    }

    #[test]
    fn test_playlist_page_uses_hls() {
        let html = render(
            &descriptor(vec![StreamSource::new("https://x/y.m3u8", "A")]),
            "english",
            true,
        );
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Episode 3"));
        assert!(html.contains(HLS_JS_URL));
        assert!(html.contains(r#""playlist":true"#));
        assert!(html.contains(" autoplay>"));
    }

    #[test]
    fn test_script_injection_is_neutralized() {
        let html = render(
            &descriptor(vec![StreamSource::new("https://x/</script><b>.mp4", "A")]),
            "<hindi>",
            false,
        );
        assert!(!html.contains("</script><b>"));
        assert!(html.contains("&lt;HINDI&gt;"));
    }

    #[test]
    fn test_empty_descriptor_page() {
        let html = render(&descriptor(Vec::new()), "english", true);
        assert!(html.contains("No playable sources found."));
        assert!(!html.contains("<video"));
    }
}
