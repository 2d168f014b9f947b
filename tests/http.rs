use axum::{Json, Router, extract::Query, routing::get};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const API_KEY: &str = "test-key";

// 2024-01-07, 2024-01-14 and 2024-02-04 (UTC)
const WEEKS: [(&str, &str, u64); 3] = [
    ("1704585600", "1705190400", 3),
    ("1705190400", "1705795200", 4),
    ("1707004800", "1707609600", 5),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackResponse {
    artist: String,
    name: String,
    now_playing: Option<bool>,
    timestamp: Option<String>,
    genre: String,
    artist_url: String,
    listeners: u64,
    hipster_score: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtistResponse {
    name: String,
    url: String,
    listeners: u64,
    hipster_score: u8,
    genre: String,
}

#[derive(Debug, Deserialize)]
struct HistoryPoint {
    week_start: String,
    playcount: u64,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

/// Fake Last.fm API, served from its own thread so it outlives every test runtime.
static STUB_URL: Lazy<String> = Lazy::new(|| {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub port");
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("stub runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let app = Router::new().route("/2.0/", get(stub_lastfm));
            axum::serve(listener, app).await.unwrap();
        });
    });

    format!("http://{addr}/2.0/")
});

async fn stub_lastfm(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let param = |key: &str| params.get(key).cloned().unwrap_or_default();

    if param("api_key") != API_KEY {
        return Json(json!({ "error": 10, "message": "Invalid API key" }));
    }

    let body = match param("method").as_str() {
        "user.getrecenttracks" => json!({
            "recenttracks": {
                "track": [
                    {
                        "name": "When the Sun Hits",
                        "artist": { "#text": "Slowdive" },
                        "album": { "#text": "Souvlaki" },
                        "image": [{ "#text": "s.png" }, { "#text": "xl.png" }],
                        "@attr": { "nowplaying": "true" }
                    },
                    {
                        "name": "Basement Demo",
                        "artist": { "#text": "Tiny Band" },
                        "album": { "#text": "" },
                        "image": [],
                        "date": { "uts": "1707000000" }
                    },
                    {
                        "name": "Chart Topper",
                        "artist": { "#text": "Huge Star" },
                        "album": { "#text": "Hits" },
                        "image": [],
                        "date": { "uts": "1706990000" }
                    },
                    {
                        "name": "Lost Tape",
                        "artist": { "#text": "Nobody Knows" },
                        "album": { "#text": "" },
                        "image": [],
                        "date": { "uts": "1706980000" }
                    },
                    {
                        "name": "Bedroom Hiss",
                        "artist": { "#text": "Zero" },
                        "album": { "#text": "" },
                        "image": [],
                        "date": { "uts": "1706970000" }
                    }
                ]
            }
        }),
        "track.getinfo" => json!({
            "track": { "toptags": { "tag": [{ "name": "Shoegaze" }, { "name": "dream pop" }] } }
        }),
        "artist.getinfo" => {
            let (listeners, tag) = match param("artist").as_str() {
                "Slowdive" => ("562341", "shoegaze"),
                "Tiny Band" => ("10", "lo-fi"),
                "Huge Star" => ("50000000", "pop"),
                "Zero" => ("0", "noise"),
                _ => return Json(json!({ "error": 6, "message": "The artist you supplied could not be found" })),
            };
            json!({
                "artist": {
                    "name": param("artist"),
                    "stats": { "listeners": listeners, "playcount": "1" },
                    "tags": { "tag": [{ "name": tag }] }
                }
            })
        }
        "user.gettopartists" => {
            let period = param("period");
            json!({
                "topartists": {
                    "artist": [
                        { "name": "Huge Star", "playcount": "60", "url": format!("https://example.test/{period}"), "image": [] },
                        { "name": "Slowdive", "playcount": "30", "url": format!("https://example.test/{period}"), "image": [] },
                        { "name": "Tiny Band", "playcount": "10", "url": format!("https://example.test/{period}"), "image": [] },
                        { "name": "Zero", "playcount": "0", "url": format!("https://example.test/{period}"), "image": [] }
                    ]
                }
            })
        }
        "user.getweeklychartlist" => json!({
            "weeklychartlist": {
                "chart": WEEKS
                    .iter()
                    .map(|(from, to, _)| json!({ "#text": "", "from": from, "to": to }))
                    .collect::<Vec<_>>()
            }
        }),
        "user.getweeklyartistchart" => {
            let from = param("from");
            let plays = WEEKS
                .iter()
                .find(|(start, _, _)| *start == from)
                .map_or(0, |(_, _, plays)| *plays);
            json!({
                "weeklyartistchart": {
                    "artist": [
                        { "name": "SLOWDIVE", "playcount": plays.to_string() },
                        { "name": "Ride", "playcount": "1" }
                    ]
                }
            })
        }
        _ => json!({ "error": 3, "message": "Invalid Method" }),
    };

    Json(body)
}

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client
            .get(format!("{base_url}/api/hipster/profile"))
            .send()
            .await
        {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_hipster_dash"))
        .env("PORT", port.to_string())
        .env("LASTFM_API_URL", STUB_URL.as_str())
        .env("LASTFM_API_KEY", API_KEY)
        .env("LASTFM_USERNAME", "listener")
        .env("RECENT_TRACKS_LIMIT", "5")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

// Starts the binary in a directory whose .env carries all Last.fm settings.
async fn spawn_server_with_dotenv(profile: &str) -> TestServer {
    let port = pick_free_port();
    let dir = std::env::temp_dir().join(format!("hipster-dash-dotenv-{port}"));
    std::fs::create_dir_all(&dir).expect("create .env dir");
    std::fs::write(
        dir.join(".env"),
        format!(
            "LASTFM_API_URL={}\nLASTFM_API_KEY={API_KEY}\nLASTFM_USERNAME=listener\nHIPSTER_PROFILE={profile}\n",
            STUB_URL.as_str()
        ),
    )
    .expect("write .env");

    let child = Command::new(env!("CARGO_BIN_EXE_hipster_dash"))
        .current_dir(&dir)
        .env_remove("LASTFM_API_URL")
        .env_remove("LASTFM_API_KEY")
        .env_remove("LASTFM_USERNAME")
        .env_remove("HIPSTER_PROFILE")
        .env("PORT", port.to_string())
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn get_json<T: for<'de> Deserialize<'de>>(server: &TestServer, path: &str) -> T {
    let response = Client::new()
        .get(format!("{}{path}", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success(), "{path}: {}", response.status());
    response.json().await.unwrap()
}

#[tokio::test]
async fn http_score_endpoint_scores_and_classifies() {
    let server = shared_server().await;

    let body: Value = get_json(&server, "/api/hipster/score?listeners=31623").await;
    let score = body["hipsterScore"].as_f64().unwrap();
    assert!((score - 50.0).abs() < 0.1);
    assert_eq!(body["category"], "Indie");
    assert_eq!(body["label"], "🎪 Indie");
    assert_eq!(body["formatted"], "32K");

    let response = Client::new()
        .get(format!("{}/api/hipster/score?listeners=-4", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_profile_exposes_constants_and_bands() {
    let server = shared_server().await;

    let body: Value = get_json(&server, "/api/hipster/profile").await;
    assert_eq!(body["profile"]["baseScore"], 140.0);
    assert_eq!(body["profile"]["scaleFactor"], 20.0);
    assert_eq!(body["bands"].as_array().unwrap().len(), 5);
    assert_eq!(body["bands"][4]["category"], "Ultra Hipster");
}

#[tokio::test]
async fn http_settings_load_from_dotenv_file() {
    let server = spawn_server_with_dotenv("legacy").await;

    let body: Value = get_json(&server, "/api/hipster/profile").await;
    assert_eq!(body["profile"]["name"], "legacy");
    assert_eq!(body["profile"]["baseScore"], 100.0);

    let track: TrackResponse = get_json(&server, "/api/lastfm/last-played").await;
    assert_eq!(track.artist, "Slowdive");
}

#[tokio::test]
async fn http_responses_allow_cross_origin_requests() {
    let server = shared_server().await;

    let response = Client::new()
        .get(format!("{}/api/hipster/score?listeners=1000", server.base_url))
        .header("Origin", "https://dashboard.example")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );

    let preflight = Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/lastfm/music-stats", server.base_url),
        )
        .header("Origin", "https://dashboard.example")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert!(
        preflight
            .headers()
            .contains_key("access-control-allow-methods")
    );
}

#[tokio::test]
async fn http_last_played_reports_now_playing_with_score() {
    let server = shared_server().await;

    let track: TrackResponse = get_json(&server, "/api/lastfm/last-played").await;
    assert_eq!(track.name, "When the Sun Hits");
    assert_eq!(track.now_playing, Some(true));
    assert_eq!(track.timestamp, None);
    assert_eq!(track.genre, "shoegaze");
    assert_eq!(track.listeners, 562_341);
    // 140 - log10(562341) * 20 = 25.0
    assert_eq!(track.hipster_score, 25);
    assert_eq!(track.artist_url, "https://www.last.fm/music/Slowdive");
}

#[tokio::test]
async fn http_recent_tracks_skip_the_hero_track() {
    let server = shared_server().await;

    let tracks: Vec<TrackResponse> = get_json(&server, "/api/lastfm/recent-tracks").await;
    let names: Vec<&str> = tracks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Basement Demo", "Chart Topper", "Lost Tape", "Bedroom Hiss"]
    );

    assert_eq!(tracks[0].artist, "Tiny Band");
    assert_eq!(tracks[0].hipster_score, 100);
    assert_eq!(tracks[0].timestamp.as_deref(), Some("1707000000"));
    assert_eq!(tracks[0].now_playing, None);
    assert_eq!(tracks[1].hipster_score, 0);

    // Unknown artists degrade instead of failing the whole list.
    assert_eq!(tracks[2].listeners, 0);
    assert_eq!(tracks[2].hipster_score, 0);

    // A known count of zero is as obscure as it gets.
    assert_eq!(tracks[3].artist, "Zero");
    assert_eq!(tracks[3].listeners, 0);
    assert_eq!(tracks[3].hipster_score, 100);
}

#[tokio::test]
async fn http_top_artists_fall_back_to_last_week() {
    let server = shared_server().await;

    let artists: Vec<ArtistResponse> =
        get_json(&server, "/api/lastfm/top-artists?period=forever").await;
    assert_eq!(artists.len(), 4);
    assert!(artists.iter().all(|a| a.url.ends_with("/7day")));
    assert_eq!(artists[1].name, "Slowdive");
    assert_eq!(artists[1].listeners, 562_341);
    assert_eq!(artists[1].hipster_score, 25);
    assert_eq!(artists[1].genre, "shoegaze");
    assert_eq!(artists[3].name, "Zero");
    assert_eq!(artists[3].listeners, 0);
    assert_eq!(artists[3].hipster_score, 100);

    let yearly: Vec<ArtistResponse> = get_json(&server, "/api/lastfm/top-artists-year").await;
    assert!(yearly.iter().all(|a| a.url.ends_with("/12month")));
}

#[tokio::test]
async fn http_artist_history_aggregates_by_month() {
    let server = shared_server().await;

    let weekly: Vec<HistoryPoint> =
        get_json(&server, "/api/lastfm/artist-history/Slowdive?weeks=2").await;
    let plays: Vec<u64> = weekly.iter().map(|w| w.playcount).collect();
    assert_eq!(plays, vec![4, 5]);

    let monthly: Vec<HistoryPoint> =
        get_json(&server, "/api/lastfm/artist-history/slowdive?aggregate=month").await;
    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0].week_start, "1704585600");
    assert_eq!(monthly[0].playcount, 7);
    assert_eq!(monthly[1].playcount, 5);
}

#[tokio::test]
async fn http_music_stats_and_genres() {
    let server = shared_server().await;

    let stats: Value = get_json(&server, "/api/lastfm/music-stats?period=1month").await;
    // scores 0, 25, 100 and 100
    assert_eq!(stats["avgHipsterScore"], 56);
    assert_eq!(stats["hipsterDistribution"]["Mainstream"], 1);
    assert_eq!(stats["hipsterDistribution"]["Popular"], 1);
    assert_eq!(stats["hipsterDistribution"]["Ultra Hipster"], 2);
    assert_eq!(stats["artistDiversity"]["topArtistName"], "Huge Star");
    assert_eq!(stats["artistDiversity"]["topArtistPercentage"], 60.0);

    let genres: Value = get_json(&server, "/api/lastfm/top-genres?period=1month").await;
    assert_eq!(genres[0]["genre"], "pop");
    assert_eq!(genres[0]["count"], 60);

    let profile: Value = get_json(&server, "/api/lastfm/genre-profile?periods=1month,bogus").await;
    let periods = profile.as_object().unwrap();
    assert_eq!(periods.len(), 1);
    assert_eq!(profile["1month"]["pop"], 60.0);
    assert_eq!(profile["1month"]["lo-fi"], 10.0);
}
