use anyhow::{anyhow, Context};
use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use kdl_engine::{forecast_all, BattleOutcome, CampaignKind, Game, GameState, History, Tier};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body of every battle call. `state` and `history` are whatever the host
/// persisted; both are loaded leniently.
#[derive(Deserialize)]
struct BattleRequest {
    campaign: String,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    state: Value,
    #[serde(default)]
    history: Value,
}

#[derive(Serialize)]
struct Committed {
    outcome: BattleOutcome,
    state: GameState,
    history: History,
}

struct Loaded {
    kind: CampaignKind,
    tier: Tier,
    game: Game,
}

fn load(input: &str) -> anyhow::Result<Loaded> {
    let req: BattleRequest =
        serde_json::from_str(input).map_err(|e| anyhow!("invalid_request: {e}"))?;
    let kind = CampaignKind::from_key(&req.campaign)
        .ok_or_else(|| anyhow!("unknown campaign '{}'", req.campaign))?;
    let state = GameState::from_value_lenient(&req.state);
    let history = History::from_value_lenient(&req.history);
    let tier = match req.tier.as_deref() {
        Some(key) => key.parse::<Tier>()?,
        None => state.campaign(kind).selected_enemy_tier,
    };
    Ok(Loaded { kind, tier, game: Game::new(state, history) })
}

pub fn forecast_internal(input: &str) -> anyhow::Result<Value> {
    let Loaded { kind, tier, game } = load(input)?;
    let outcome = game.forecast(kind, tier)?;
    Ok(serde_json::to_value(outcome)?)
}

pub fn forecast_all_internal(input: &str) -> anyhow::Result<Value> {
    let Loaded { kind, game, .. } = load(input)?;
    let previews = forecast_all(game.state.campaign(kind))?;
    Ok(serde_json::to_value(previews)?)
}

/// Commits and hands back the outcome with the state and history to persist.
pub fn commit_internal(input: &str) -> anyhow::Result<Value> {
    let Loaded { kind, tier, mut game } = load(input)?;
    let outcome = game
        .fight(kind, tier)
        .with_context(|| format!("{kind} cannot fight {tier}"))?;
    let committed = Committed { outcome, state: game.state, history: game.history };
    Ok(serde_json::to_value(committed)?)
}

fn respond(env: &JNIEnv, result: anyhow::Result<Value>) -> jstring {
    let payload = match result {
        Ok(value) => json!({ "ok": true, "result": value }),
        Err(e) => json!({ "ok": false, "error": format!("{e:#}") }),
    };
    let text = serde_json::to_string(&payload)
        .unwrap_or_else(|_| r#"{"ok":false,"error":"unserializable result"}"#.to_string());
    match env.new_string(text) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn with_input(
    env: &mut JNIEnv,
    json: &JString,
    f: fn(&str) -> anyhow::Result<Value>,
) -> jstring {
    let result = match env.get_string(json) {
        Ok(s) => f(&String::from(s)),
        Err(e) => Err(anyhow!("invalid_string: {e}")),
    };
    respond(env, result)
}

#[no_mangle]
pub extern "system" fn Java_com_kdl_Ffi_version(env: JNIEnv, _class: JClass) -> jstring {
    match env.new_string(concat!("kdl-ffi ", env!("CARGO_PKG_VERSION"))) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "system" fn Java_com_kdl_Ffi_forecastJson(
    mut env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_input(&mut env, &json, forecast_internal)
}

#[no_mangle]
pub extern "system" fn Java_com_kdl_Ffi_forecastAllJson(
    mut env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_input(&mut env, &json, forecast_all_internal)
}

#[no_mangle]
pub extern "system" fn Java_com_kdl_Ffi_commitJson(
    mut env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_input(&mut env, &json, commit_internal)
}
