//! The built-in command set of the security console.
//!
//! Handlers receive the full submitted line and the borrowed
//! [`CommandContext`]; anything user-provided that gets interpolated into
//! output goes through [`escape_markup`] first.

use crate::audio::AudioCue;
use crate::session::TimerToken;
use crate::stage::{HistoryEntry, Surface};

use super::core::{CommandContext, CommandRegistry, CommandSpec, escape_markup, normalize_keyword};

/// Register every built-in command in its canonical order. Idempotent, so
/// embedders can call it before or after adding their own commands.
pub fn install_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(CommandSpec::new(
        "music",
        "turn background music on or off",
        concat!(
            "SYNOPSIS\n",
            "\tmusic [on|off]\n",
            "\n",
            "DESCRIPTION\n",
            "\tManage the state of the 'Dennis Steals the Embryo' music. Use the 'on' state for\n",
            "\tincreased epicness.\n",
            "\n",
            "AUTHOR\n",
            "\tWritten by Tully Robinson.",
        ),
        music,
    ));

    registry.register(CommandSpec::new(
        "access",
        "access a target environment on the Jurassic Systems grid",
        concat!(
            "SYNOPSIS\n",
            "\taccess [SYSTEM_NAME] [MAGIC_WORD]\n",
            "\n",
            "DESCRIPTION\n",
            "\tGain read and write access to a specified environment.\n",
            "\n",
            "AUTHOR\n",
            "\tWritten by Dennis Nedry.",
        ),
        access,
    ));

    registry.register(CommandSpec::new(
        "system",
        "check a system's current status",
        concat!(
            "SYNOPSIS\n",
            "\tsystem [SYSTEM_NAME]\n",
            "\n",
            "DESCRIPTION\n",
            "\tCheck the input system and return each sector's current status.\n",
            "\n",
            "AUTHOR\n",
            "\tWritten by Dennis Nedry.",
        ),
        system,
    ));

    registry.register(CommandSpec::new(
        "ls",
        "list files in the current directory",
        concat!(
            "SYNOPSIS\n",
            "\tls [FILE] ...\n",
            "\n",
            "DESCRIPTION\n",
            "\tList information about the FILEs (the current directory by default).\n",
            "\n",
            "AUTHOR\n",
            "\tWritten by Richard Stallman and David MacKenzie.",
        ),
        ls,
    ));

    registry.register(CommandSpec::new(
        "display",
        "display image files (hint: use ls to find a 'file')",
        concat!(
            "SYNOPSIS\n",
            "\tdisplay file ...\n",
            "\n",
            "DESCRIPTION\n",
            "\tDisplay is a machine architecture independent image processing and display program. ",
            "It can display an image on any workstation screen running an X server.\n",
            "\n",
            "AUTHOR\n",
            "\tJohn Cristy, ImageMagick Studio.",
        ),
        display,
    ));

    registry.register(CommandSpec::new(
        "keychecks",
        "display system level command history",
        concat!(
            "SYNOPSIS\n",
            "\tkeychecks\n",
            "\n",
            "DESCRIPTION\n",
            "\tA system level command log used for accountability purposes. keychecks must be ",
            "activated or deactivated via the main board.",
        ),
        keychecks,
    ));

    registry.register(CommandSpec::new(
        "man",
        "display reference manual for a given command",
        concat!(
            "SYNOPSIS\n",
            "\tman title ...\n",
            "\n",
            "DESCRIPTION\n",
            "\tman locates and prints the titled entries from the on-line reference manuals.",
        ),
        man,
    ));

    registry.register(CommandSpec::new(
        "help",
        "list available commands",
        concat!(
            "SYNOPSIS\n",
            "\thelp\n",
            "\n",
            "DESCRIPTION\n",
            "\tDisplay a command summary for Jurassic Systems.\n",
            "\n",
            "AUTHOR\n",
            "\tWritten by Tully Robinson.",
        ),
        help,
    ));
}

fn second_token(line: &str) -> Option<&str> {
    line.split_whitespace().nth(1)
}

fn music(ctx: &mut CommandContext<'_>, line: &str) {
    let arg = second_token(line).unwrap_or("");
    let on = arg.eq_ignore_ascii_case("on");
    if !on && !arg.eq_ignore_ascii_case("off") {
        ctx.out_text("music: must specify state [on|off]");
        return;
    }

    if on {
        if !ctx.state.music_on {
            ctx.audio.play(AudioCue::DennisMusic);
        }
        ctx.state.music_on = true;
    } else {
        ctx.audio.stop(AudioCue::DennisMusic);
        ctx.state.music_on = false;
    }
}

fn access(ctx: &mut CommandContext<'_>, line: &str) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        ctx.out_text("access: must specify target system");
        return;
    }

    // The magic word only counts when it is the final token of a >=3 token
    // line; the denial counter is untouched on this path.
    let magic_word = tokens
        .last()
        .filter(|_| tokens.len() > 2)
        .is_some_and(|word| word.eq_ignore_ascii_case("please"));
    if magic_word {
        ctx.out_entry(HistoryEntry::Image {
            name: "asciiNewman".to_string(),
        });
        return;
    }

    ctx.out_text("access: PERMISSION DENIED.");
    ctx.audio.play(AudioCue::Beep);
    ctx.state.failed_access_attempts += 1;
    ctx.lockdown.note_denial();

    if ctx.state.failed_access_attempts < ctx.lockdown_threshold {
        return;
    }

    let now = ctx.now;
    let window = ctx.window.clone();
    ctx.lockdown.trigger(
        now,
        window,
        &mut *ctx.state,
        &mut *ctx.windows,
        &mut *ctx.stage,
        &mut *ctx.timers,
    );
}

fn system(ctx: &mut CommandContext<'_>, line: &str) {
    let Some(arg) = second_token(line) else {
        ctx.out_text("system: must specify target system");
        return;
    };

    let base = if arg.ends_with('s') || arg.ends_with('S') {
        &arg[..arg.len() - 1]
    } else {
        arg
    };
    let mut chars = base.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };
    let safe = escape_markup(&capitalized);

    ctx.out_entry(HistoryEntry::Table {
        title: format!("{safe} containment enclosure...."),
        rows: vec![
            ("Security".to_string(), "[OK]".to_string()),
            ("Fence".to_string(), "[OK]".to_string()),
            ("Feeding Pavilion".to_string(), "[OK]".to_string()),
        ],
    });

    ctx.stage.set_prompt_visible(ctx.window, false);
    ctx.audio.play(AudioCue::Beep);

    let halt_at = ctx.now + ctx.system_halt_delay;
    let token = TimerToken::SystemHalt {
        window: ctx.window.clone(),
    };
    ctx.timers.schedule(halt_at, token);
}

fn ls(ctx: &mut CommandContext<'_>, _line: &str) {
    ctx.out_text("zebraGirl.jpg");
}

fn display(ctx: &mut CommandContext<'_>, line: &str) {
    if second_token(line).is_none() {
        ctx.out_text("display: no file specified");
        return;
    }

    if line.to_lowercase().contains("zebragirl.jpg") {
        let reveal_at = ctx.now + ctx.overlay_reveal_delay;
        ctx.timers.schedule(
            reveal_at,
            TimerToken::RevealOverlay {
                surface: Surface::ZebraGirl,
            },
        );
    }
}

fn keychecks(ctx: &mut CommandContext<'_>, _line: &str) {
    ctx.out_text(concat!(
        "13,42,121,32,88,77,19,13,44,52,77,90,13,99,13,100,13,109,55,103,144,13,99,87,60,13,",
        "44,12,09,13,43,63,13,46,57,89,103,122,13,44,52,88,931,13,21,13,57,98,100,102,103,13,",
        "112,13,146,13,13,13,77,67,88,23,13,13\n",
        "system\n",
        "nedry\n",
        "go to command level\n",
        "nedry\n",
        "040/#xy/67&\n",
        "mr goodbytes\n",
        "security\n",
        "keycheck off\n",
        "safety off\n",
        "sl off\n",
        "security\n",
        "whte_rbt.obj",
    ));
}

fn man(ctx: &mut CommandContext<'_>, line: &str) {
    let Some(arg) = second_token(line) else {
        ctx.out_text("What manual page do you want?");
        return;
    };

    let normalized = normalize_keyword(arg);
    let page = ctx
        .registry
        .get(&normalized)
        .map(|spec| spec.man_page.clone());
    match page {
        Some(page) => ctx.out_text(page),
        None => ctx.out_text(format!("No manual entry for {}", escape_markup(arg))),
    }
}

fn help(ctx: &mut CommandContext<'_>, _line: &str) {
    let lines: Vec<String> = ctx
        .registry
        .iter()
        .map(|spec| format!("{} - {}", spec.name, spec.summary))
        .collect();
    for line in lines {
        ctx.out_text(line);
    }
}
