use std::process::ExitCode;

use room_engine::{
    DrawEntry, GridPos, InputContext, PointerInput, Session, SessionEvent, Vec2,
};
use tracing::{debug, error, info, warn};

use super::bootstrap::AppWiring;
use super::script::ScriptAction;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        mut session,
        script,
    } = app;
    let fixed_dt = session.config().fixed_dt();
    let last_tick = script.last_tick();
    let mut steps = script.steps.into_iter().peekable();

    info!(last_tick, "script_started");
    while session.tick_count() <= last_tick {
        let tick = session.tick_count();
        while let Some(step) = steps.next_if(|step| step.tick <= tick) {
            apply_action(&mut session, step.action);
        }
        if session.advance(fixed_dt) == 0 {
            error!(tick, "clock_stalled");
            return ExitCode::FAILURE;
        }
        flush(&mut session, tick);
    }

    log_draw_list(&session);
    info!(ticks = session.tick_count(), "script_finished");
    ExitCode::SUCCESS
}

fn apply_action(session: &mut Session, action: ScriptAction) {
    match action {
        ScriptAction::Inbound { message } => {
            // Dropped messages are already logged by the session.
            let _ = session.handle_message(&message.to_string());
        }
        ScriptAction::Pointer {
            x,
            y,
            press,
            release,
            panel,
            chat_focused,
        } => {
            let context = InputContext::empty()
                .with_open_panel(panel)
                .with_chat_focused(chat_focused);
            let pointer = PointerInput::at(Vec2::new(x, y))
                .with_pressed(press)
                .with_released(release);
            session.handle_pointer(&context, &pointer);
        }
        ScriptAction::Escape => {
            let pointer = PointerInput::empty().with_escape_pressed(true);
            session.handle_pointer(&InputContext::empty(), &pointer);
        }
        ScriptAction::InventoryPlace { kind, name } => {
            if session.begin_inventory_placement(kind, &name).is_none() {
                warn!(name = %name, "inventory_placement_refused");
            }
        }
        ScriptAction::ObjectAction { x, y, op } => {
            let cell = GridPos::new(x, y);
            let target = session
                .room()
                .and_then(|room| room.registry().entity_at(cell));
            match target {
                Some(entity) if session.object_action(entity, op) => {}
                _ => warn!(x, y, action = ?op, "object_action_refused"),
            }
        }
        ScriptAction::Chat { message } => {
            if !session.send_chat(&message) {
                debug!("chat_not_sent");
            }
        }
        ScriptAction::PreviewSkin { tile, wall } => session.preview_skin(tile, wall),
        ScriptAction::Disconnect => session.connection_lost(),
    }
}

fn flush(session: &mut Session, tick: u64) {
    for command in session.take_outbound() {
        match command.to_json() {
            Ok(json) => info!(tick, command = %json, "outbound_command"),
            Err(err) => {
                error!(tick, kind = command.kind(), error = %err, "outbound_encode_failed")
            }
        }
    }
    for event in session.take_events() {
        match &event {
            SessionEvent::Disconnected => info!(tick, "session_disconnected"),
            other => info!(tick, event = ?other, "session_event"),
        }
    }
    if let Some(room) = session.room() {
        debug!(tick, entries = room.draw_list().len(), "draw_list_rebuilt");
    }
}

fn log_draw_list(session: &Session) {
    let Some(room) = session.room() else {
        info!("no_room_to_draw");
        return;
    };
    info!(
        room = %room.name(),
        entries = room.draw_list().len(),
        background_revision = room.background_revision(),
        "final_draw_list"
    );
    for (index, entry) in room.draw_list().iter().enumerate() {
        match entry {
            DrawEntry::Entity {
                id,
                anchor,
                sprite,
                translucent,
            } => {
                let (key, mirrored) = sprite.key();
                info!(
                    index,
                    entity = id.0,
                    x = anchor.x,
                    y = anchor.y,
                    sprite = %key,
                    mirrored,
                    translucent,
                    "draw_entity"
                );
            }
            DrawEntry::SeatForeground {
                host,
                anchor,
                sprite,
            } => {
                let (key, _) = sprite.key();
                info!(
                    index,
                    host = host.0,
                    x = anchor.x,
                    y = anchor.y,
                    sprite = %key,
                    "draw_seat_foreground"
                );
            }
            DrawEntry::ExitForeground { clip } => {
                info!(index, points = clip.len(), "draw_exit_foreground")
            }
        }
    }
}
