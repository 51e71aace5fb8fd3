//! Morning greeting assembly.
//!
//! A greeting is an opener (possibly with stretched vowels), an endearment
//! drawn from shared or opener-specific lists, and a burst of emoji drawn
//! from biased groups.

use rand::Rng;

use super::{low_random, stretched};

/// Emoji groups, each led by an empty entry so a group can contribute
/// nothing. The paired exponent biases the pick towards the front.
const EMOJI_GROUPS: [(&[&str], f64); 6] = [
    (&["", "\u{1f44b}", "\u{270c}"], 3.5),
    (&["", "\u{1f61b}", "\u{1f61d}", "\u{1f92a}", "\u{1f60b}"], 5.0),
    (&["", "\u{1f643}", "\u{1f601}", "\u{1f604}", "\u{1f603}"], 4.0),
    (
        &["", "\u{1f917}", "\u{1f61a}", "\u{1f60a}", "\u{263a}", "\u{1f92d}"],
        3.0,
    ),
    (&["", "\u{1f970}", "\u{1f618}"], 1.3),
    (&["", "\u{1faf6}", "\u{2764}"], 2.0),
];

/// Returns a random good-morning message with at least one emoji.
pub fn morning_greeting(rng: &mut impl Rng) -> String {
    format!("{} {}", greeting_line(rng), emoji_burst(rng))
}

fn greeting_line(rng: &mut impl Rng) -> String {
    match rng.gen_range(0..10u8) {
        0 => format!(
            "Hol{} {}",
            stretched(rng, 'a', 10),
            shared_endearment(rng)
        ),
        1 => format!(
            "Buenos d\u{ed}as {}",
            endearment_or(rng, &["se\u{f1}orita", "princesita"])
        ),
        2 => {
            let mut line = format!("Wenas {}", shared_endearment(rng));
            if low_random(rng, 0, 1, 2.0) == 1 {
                line.push(' ');
                line.push_str(&format!("wen{}s", stretched(rng, 'a', 5)));
            }
            line
        }
        3 => format!("G\u{fc}enas {}", shared_endearment(rng)),
        4 => format!("Jelou {}", shared_endearment(rng)),
        5 => {
            let pet = match rng.gen_range(0..4u8) {
                0 => format!("mi amorcit{}", stretched(rng, 'o', 10)),
                1 => "mailob".to_owned(),
                2 => "my love".to_owned(),
                _ => "preciosura tropical".to_owned(),
            };
            format!("Jeloucito {pet}")
        }
        6 => format!("Gusmornin {}", shared_endearment(rng)),
        7 => format!("Good morning {}", shared_endearment(rng)),
        8 => format!("God morgon {}", endearment_or(rng, &["prinsessa"])),
        _ => {
            if rng.gen_bool(0.5) {
                format!(
                    "Bonjour {}",
                    pick(rng, &["mademoiselle", "princesse"])
                )
            } else {
                format!(
                    "Buongiorno {}",
                    pick(rng, &["principessa", "signorina"])
                )
            }
        }
    }
}

/// Endearments shared by most openers; the vowel-stretched ones are built on
/// the fly.
fn shared_endearment(rng: &mut impl Rng) -> String {
    match rng.gen_range(0..9u8) {
        0 => format!("am{}r", stretched(rng, 'o', 10)),
        1 => format!("mi am{}r", stretched(rng, 'o', 10)),
        2 => format!("amorcit{}", stretched(rng, 'a', 10)),
        3 => format!("mi amorcit{}", stretched(rng, 'a', 10)),
        4 => format!("amorcit{}", stretched(rng, 'o', 10)),
        5 => format!("mi amorcit{}", stretched(rng, 'o', 10)),
        6 => "mailob".to_owned(),
        7 => "my love".to_owned(),
        _ => "preciosura tropical".to_owned(),
    }
}

/// Picks either a shared endearment or one of the opener-specific extras.
fn endearment_or(rng: &mut impl Rng, extras: &[&str]) -> String {
    let roll = rng.gen_range(0..9 + extras.len());
    if roll < 9 {
        shared_endearment(rng)
    } else {
        extras[roll - 9].to_owned()
    }
}

fn pick<'a>(rng: &mut impl Rng, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

/// Builds one-to-six emoji from the biased groups, never returning an empty
/// string.
fn emoji_burst(rng: &mut impl Rng) -> String {
    loop {
        let mut burst = String::new();
        for (group, bias) in EMOJI_GROUPS {
            burst.push_str(group[low_random(rng, 1, group.len(), bias) - 1]);
        }
        if !burst.is_empty() {
            return burst;
        }
    }
}
