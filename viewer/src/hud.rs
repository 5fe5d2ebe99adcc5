//! On-screen readout of the last tick's [`HudSnapshot`].

use std::fmt::Write;

use bevy::prelude::*;
use sim::HudSnapshot;

use crate::{FrameSet, simulation::LastFrame};

#[derive(Component)]
struct HudText;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, spawn_hud);
    app.add_systems(
        Update,
        update_hud
            .run_if(resource_changed::<LastFrame>)
            .in_set(FrameSet::Present),
    );
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        HudText,
        Text::new(""),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
    ));
}

fn update_hud(mut text: Single<&mut Text, With<HudText>>, frame: Res<LastFrame>) {
    text.0 = hud_lines(&frame.0.hud);
}

fn hud_lines(hud: &HudSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "fps {:.0}", hud.fps);
    let _ = writeln!(out, "camera {}", hud.camera_mode.label());
    let _ = writeln!(
        out,
        "chunk ({}, {})  resident {}",
        hud.chunk.x, hud.chunk.z, hud.resident_chunks
    );
    let _ = writeln!(out, "bodies {}", hud.body_count);
    match &hud.selection {
        Some(info) => {
            let p = info.position;
            let v = info.velocity;
            let _ = writeln!(out, "selected #{} {}", info.id, info.kind);
            let _ = writeln!(out, "  pos ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z);
            let _ = writeln!(out, "  vel ({:.1}, {:.1}, {:.1})", v.x, v.y, v.z);
            let _ = write!(out, "  speed {:.1}", info.speed);
        }
        None => {
            let _ = write!(out, "selected none");
        }
    }
    out
}
