//! Fixture documents
//!
//! Every page shares the same chrome: a nav bar, a `<main>` region and
//! the album player outside it (so it survives in-place transitions).

use url::Url;

pub const ORIGIN: &str = "https://site.test/";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub const PLAYER: &str = r#"<section class="album-player" data-player-mode="compact">
  <audio class="album-audio" preload="none"></audio>
  <p class="album-current-title"></p>
  <p class="album-current-meta" hidden></p>
  <ol class="album-tracks">
    <li class="album-track"><button class="album-track-button" data-slug="one" data-title="One" data-year="2019" data-description="first light" data-audio="tracks/one/one.mp3" data-transcript="tracks/one/one.txt">One</button></li>
    <li class="album-track"><button class="album-track-button" data-slug="two" data-title="Two" data-audio="tracks/two/two.mp3">Two</button></li>
    <li class="album-track"><button class="album-track-button" data-slug="three" data-title="Three" data-year="2023" data-audio="tracks/three/three.mp3" data-transcript="tracks/three/three.txt">Three</button></li>
  </ol>
  <details class="album-lyrics"><summary>lyrics</summary><pre class="transcript-body"></pre></details>
  <button class="album-toggle" aria-expanded="false"><span class="album-toggle-label">open console</span></button>
</section>"#;

const NAV: &str = r#"<nav>
  <a class="nav-link" href="index.html">home</a>
  <a class="nav-link" href="runes.html">runes</a>
  <a class="nav-link" href="tracks.html">tracks</a>
  <a class="ext" href="https://elsewhere.test/">elsewhere</a>
  <a class="plain" href="runes.html" data-no-pjax="true">runes (full load)</a>
</nav>"#;

/// A complete page with the shared chrome
pub fn page(page_id: &str, title: &str, head_extra: &str, main: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{title}</title>
  <meta name="description" content="{title} page">
  <link rel="stylesheet" href="/assets/site.css">
  {head_extra}
</head>
<body class="page-{page_id}" data-page="{page_id}">
  {NAV}
  <main>{main}</main>
  {PLAYER}
</body>
</html>"#
    )
}

pub fn index() -> String {
    page("index", "home", "", r#"<h1 class="glitch">rune</h1><p id="welcome">welcome</p>"#)
}

pub fn runes() -> String {
    page("runes", "runes", "", r#"<h1>runes</h1><p id="runes-list">three runes</p>"#)
}

pub fn tracks() -> String {
    page(
        "tracks",
        "tracks",
        r#"<link rel="stylesheet" href="assets/tracks.css">"#,
        r#"<h1 class="glitch">tracks</h1>
<div class="blurb" style='--blurb: "side A\Aside B"'><p id="blurb-text" data-fallback="var(--blurb)"></p></div>
<p>&copy; <span data-now-year></span></p>"#,
    )
}

/// A scripted site serving the three pages
pub fn site() -> super::ScriptedFetcher {
    super::ScriptedFetcher::new()
        .route("index.html", &index())
        .route("runes.html", &runes())
        .route("tracks.html", &tracks())
}

/// A page whose fallbacks only resolve through its own `<style>` blocks
pub fn styled() -> String {
    page(
        "styled",
        "styled",
        r#"<style>:root { --motto: "carved in stone"; }</style>"#,
        r#"<style>.lore { --tagline: 'older than ink'; }</style>
<p id="motto" data-fallback="var(--motto)"></p>
<p id="tagline" class="lore" data-fallback="var(--tagline)"></p>"#,
    )
}
