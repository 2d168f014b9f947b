use crate::hipster::{ScoringProfile, format_listener_count, format_score};

const EXAMPLE_LISTENERS: [f64; 6] = [100_000_000.0, 1_000_000.0, 100_000.0, 10_000.0, 1_000.0, 100.0];

pub fn render_index(profile: &ScoringProfile) -> String {
    let categories: String = profile
        .bands()
        .iter()
        .map(|band| {
            format!(
                r#"        <li class="category"><span class="label">{}</span><span>Score: {}</span><span>Listeners: {}</span></li>
"#,
                band.label,
                escape(&band.score_range),
                escape(&band.listener_range)
            )
        })
        .collect();

    let examples: String = EXAMPLE_LISTENERS
        .iter()
        .map(|&listeners| {
            let score = profile.score(listeners).unwrap_or_default();
            format!(
                "        <li><strong>{} listeners:</strong> Score ~{:.0}</li>\n",
                format_listener_count(listeners),
                score
            )
        })
        .collect();

    INDEX_HTML
        .replace("{{PROFILE}}", profile.name)
        .replace("{{BASE}}", &format_score(profile.base_score))
        .replace("{{SCALE}}", &format_score(profile.scale_factor))
        .replace("{{CATEGORIES}}", &categories)
        .replace("{{EXAMPLES}}", &examples)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Hipster Score</title>
  <style>
    :root {
      --bg: #1e1e2e;
      --card: #313244;
      --ink: #cdd6f4;
      --accent: #cba6f7;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(760px, 100%);
      background: var(--card);
      border-radius: 24px;
      padding: 32px;
      display: grid;
      gap: 24px;
    }

    code {
      color: var(--accent);
    }

    .category {
      display: grid;
      grid-template-columns: 1.4fr 1fr 1.4fr;
      gap: 12px;
      padding: 6px 0;
    }

    ul {
      padding-left: 0;
      list-style: none;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Hipster Score</h1>
      <p>How obscure an artist is, from their global listener count on Last.fm.
        Scores run from 0 to 100; higher means fewer listeners. Profile: <code>{{PROFILE}}</code>.</p>
    </header>
    <section>
      <h2>Formula</h2>
      <p><code>Score = {{BASE}} - (log<sub>10</sub>(listeners) &times; {{SCALE}})</code></p>
      <p>Each tenfold increase in listeners lowers the score by {{SCALE}} points.</p>
    </section>
    <section>
      <h2>Categories</h2>
      <ul>
{{CATEGORIES}}      </ul>
    </section>
    <section>
      <h2>Example listener counts</h2>
      <ul>
{{EXAMPLES}}      </ul>
    </section>
  </main>
</body>
</html>
"#;
