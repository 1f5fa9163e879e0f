use std::collections::HashSet;

use crate::extensions::option::LabelExt;
use crate::mapping::entries;
use crate::surface::model::Surface;

/// Common VirtualDJ verbs, with typical arguments.
pub const KNOWN_ACTIONS: &[&str] = &[
    // Transport and deck
    "play_pause",
    "stop",
    "cue_stop",
    "sync",
    "loop",
    "reloop",
    "loop_halve",
    "loop_double",
    "pitch_reset",
    "pitch_bend +1%",
    "pitch_bend -1%",
    "vinyl_mode",
    // Mixer and EQ
    "volume",
    "volume_deck 1",
    "volume_deck 2",
    "crossfader",
    "eq_low",
    "eq_mid",
    "eq_high",
    "filter",
    "gain",
    "pitch",
    "eq_low_deck 1",
    "eq_mid_deck 1",
    "eq_high_deck 1",
    "eq_low_deck 2",
    "eq_mid_deck 2",
    "eq_high_deck 2",
    "master_volume",
    "headphones_volume",
    "headphones_mix",
    "cue_monitor_deck 1",
    "cue_monitor_deck 2",
    // Jog wheel
    "jog_wheel",
    "scratch",
    "touch_wheel",
    "search",
    "jog_wheel_touch",
    // Browser
    "browser_scroll",
    "browser_enter",
    "browser_back",
    "load",
    "sideview_scroll",
    "sideview_enter",
    "playlist_add",
    // Hotcues
    "hotcue 1",
    "hotcue 2",
    "hotcue 3",
    "hotcue 4",
    "hotcue 5",
    "hotcue 6",
    "hotcue 7",
    "hotcue 8",
    "delete_hotcue 1",
    "goto_hotcue 1",
    // Sampler
    "sampler_play 1",
    "sampler_play 2",
    "sampler_play 3",
    "sampler_play 4",
    "sampler_stop 1",
    "sampler_volume",
    "sampler_bank next",
    "sampler_bank prev",
    "sampler_pad 1",
    "sampler_pad 2",
    "sampler_pad 3",
    "sampler_pad 4",
    // Effects
    "effect active",
    "effect select +1",
    "effect select -1",
    "effect slider 1",
    "effect slider 2",
    "effect slider 3",
    "effect_button 1",
    "effect_button 2",
    "effect_knob 1",
    "effect_knob 2",
    // Misc
    "mic_active",
    "talkover",
    "record",
    "automix",
];

fn verb(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

fn known_verbs() -> HashSet<&'static str> {
    KNOWN_ACTIONS.iter().map(|action| verb(action)).collect()
}

/// Whether every `&` chained command of `label` starts with a known verb.
pub fn is_known(label: &str) -> bool {
    let verbs = known_verbs();
    label
        .split('&')
        .map(str::trim)
        .all(|command| verbs.contains(verb(command)))
}

/// Non empty labels in the mapping document whose verb is not catalogued, first occurrence only.
pub fn unknown_actions(surface: &Surface) -> Vec<String> {
    let mut seen = HashSet::new();
    entries(surface)
        .into_iter()
        .map(|entry| entry.action)
        .filter(|action| action.non_blank().is_some() && !is_known(action))
        .filter(|action| seen.insert(action.clone()))
        .collect()
}
