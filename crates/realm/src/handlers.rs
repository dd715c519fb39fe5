//! Session flow of the realm server.
//!
//! A connection goes through login, character selection and loading before
//! it enters the world:
//!
//! ```text
//! Authenticating --TokenLogin--> LoggedIn --SelectCharacter--> CharacterSelect --EnterGame--> InWorld
//! ```
//!
//! Every phase change is announced to the client with a `Phase` packet.

use crate::accounts::{AccountStore, CharacterRecord, SLOTS};
use crate::session::{Session, QUICK_BAR_SLOTS};
use crate::world::{InMemoryWorld, PlayerEntity};
use dashmap::DashMap;
use game_server::{
    Connection, ConnectionId, DispatchTable, EntityId, HandlerError, HandlerResult, PacketContext, Phase,
    ServerContext, WorldError,
};
use realm_codec::{FixedStr, Packet};
use realm_protocol::{
    CharacterDetails, CharacterMove, CharacterMoveOut, Characters, ChatIncoming, ChatOutgoing, CreateCharacter,
    EnterGame, ItemMove, ItemUse, LoginFailed, Phase as PhasePacket, QuickBarAdd, QuickBarAdded, RemoveCharacter,
    SelectCharacter, SpawnCharacter, TargetChange, TargetOut, TokenLogin,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Character type of players in `SpawnCharacter`.
const PLAYER_CHARACTER_TYPE: u8 = 6;

/// Game state shared by every handler.
pub struct Realm {
    accounts: Arc<dyn AccountStore>,
    world: Arc<InMemoryWorld>,
    sessions: DashMap<ConnectionId, Session>,
}

impl Realm {
    pub fn new(accounts: Arc<dyn AccountStore>, world: Arc<InMemoryWorld>) -> Self {
        Self {
            accounts,
            world,
            sessions: DashMap::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session<T>(&self, id: ConnectionId, f: impl FnOnce(&mut Session) -> T) -> Result<T, HandlerError> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| HandlerError::close("connection has no session"))?;
        Ok(f(session.value_mut()))
    }
}

/// The phase byte the client expects for each connection phase.
pub fn phase_byte(phase: Phase) -> u8 {
    match phase {
        Phase::Closing => 0,
        Phase::Authenticating => 2,
        Phase::LoggedIn => 3,
        Phase::CharacterSelect => 4,
        Phase::InWorld => 5,
    }
}

/// Builds the dispatch table wiring every realm handler and hook.
pub fn dispatch_table(realm: Arc<Realm>) -> DispatchTable {
    let mut table = DispatchTable::new();

    table
        .register_handler(Phase::Authenticating.into(), with_realm(&realm, on_token_login))
        .register_handler(Phase::LoggedIn.into(), with_realm(&realm, on_create_character))
        .register_handler(Phase::LoggedIn.into(), with_realm(&realm, on_select_character))
        .register_handler(Phase::CharacterSelect.into(), with_realm(&realm, on_enter_game))
        .register_handler(Phase::InWorld.into(), with_realm(&realm, on_character_move))
        .register_handler(Phase::InWorld.into(), with_realm(&realm, on_chat))
        .register_handler(Phase::InWorld.into(), with_realm(&realm, on_quick_bar_add))
        .register_handler(Phase::InWorld.into(), with_realm(&realm, on_target_change))
        .register_handler(Phase::InWorld.into(), with_realm(&realm, on_item_move))
        .register_handler(Phase::InWorld.into(), with_realm(&realm, on_item_use));

    let on_open = realm.clone();
    table.on_handshake_complete(move |connection, _server| {
        let realm = on_open.clone();
        async move {
            realm.sessions.insert(connection.id(), Session::default());
            connection
                .send(&PhasePacket {
                    phase: phase_byte(Phase::Authenticating),
                })
                .await?;
            Ok(())
        }
    });

    table.on_close(move |connection, server| {
        let realm = realm.clone();
        async move { on_close(realm, connection, server).await }
    });

    table
}

/// Adapts a handler taking the shared [`Realm`] to the dispatch table's
/// handler signature.
fn with_realm<P, H, Fut>(realm: &Arc<Realm>, handler: H) -> impl Fn(PacketContext<P>) -> Fut + Send + Sync + 'static
where
    P: Packet,
    H: Fn(Arc<Realm>, PacketContext<P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let realm = realm.clone();
    move |ctx| handler(realm.clone(), ctx)
}

/// Moves the connection to `phase` and tells the client.
async fn enter_phase(connection: &Connection, phase: Phase) -> HandlerResult {
    if !connection.set_phase(phase) {
        return Err(HandlerError::close("connection is closing"));
    }
    connection.send(&PhasePacket { phase: phase_byte(phase) }).await?;
    Ok(())
}

fn character_list(characters: &[Option<CharacterRecord>]) -> Characters {
    let mut list = Characters::default();
    for (slot, character) in characters.iter().take(SLOTS).enumerate() {
        if let Some(character) = character {
            list.characters[slot] = character.to_slot();
        }
    }
    list
}

fn spawn_packet(player: &PlayerEntity) -> SpawnCharacter {
    SpawnCharacter {
        vid: player.vid.0,
        angle: player.rotation as u32 * 5,
        x: player.x,
        y: player.y,
        z: 0,
        character_type: PLAYER_CHARACTER_TYPE,
        class: player.class,
        move_speed: 150,
        attack_speed: 100,
        state: 0,
        affects: [0; 2],
    }
}

fn player_entity(connection: &Connection) -> Result<EntityId, HandlerError> {
    connection
        .entity()
        .ok_or_else(|| HandlerError::close("no player entity linked to the connection"))
}

async fn on_token_login(realm: Arc<Realm>, ctx: PacketContext<TokenLogin>) -> HandlerResult {
    let connection = &ctx.connection;
    let username = ctx.packet.username.as_str();

    let Some(account) = realm.accounts.authenticate(username, ctx.packet.key).await else {
        warn!(connection = %connection.id(), "🔒 Login rejected for '{}'", username);
        connection
            .send(&LoginFailed {
                status: "WRONGPWD".into(),
            })
            .await?;
        return Err(HandlerError::close("invalid login key"));
    };

    connection.set_identity(account);
    let characters = realm.accounts.characters(account).await;
    let list = character_list(&characters);
    realm.session(connection.id(), |session| {
        session.account = Some(account);
        session.characters = characters;
    })?;

    info!(connection = %connection.id(), "🔑 '{}' logged in as account {}", username, account);
    enter_phase(connection, Phase::LoggedIn).await?;
    connection.send(&list).await?;
    Ok(())
}

async fn on_create_character(realm: Arc<Realm>, ctx: PacketContext<CreateCharacter>) -> HandlerResult {
    let connection = &ctx.connection;
    let account = connection
        .identity()
        .ok_or_else(|| HandlerError::close("character creation before login"))?;
    let request = &ctx.packet;

    let created = realm
        .accounts
        .create_character(account, request.slot, request.name.as_str(), request.class)
        .await
        .map_err(|e| HandlerError::failed(e.to_string()))?;
    info!(connection = %connection.id(), "🆕 Created character '{}' in slot {}", created.name, request.slot);

    let characters = realm.accounts.characters(account).await;
    let list = character_list(&characters);
    realm.session(connection.id(), |session| session.characters = characters)?;
    connection.send(&list).await?;
    Ok(())
}

async fn on_select_character(realm: Arc<Realm>, ctx: PacketContext<SelectCharacter>) -> HandlerResult {
    let connection = &ctx.connection;
    let slot = ctx.packet.slot;

    let selected = realm.session(connection.id(), |session| {
        let character = session.characters.get(slot as usize).cloned().flatten();
        if let Some(character) = &character {
            session.selected = Some(character.clone());
            session.load_starter_inventory();
        }
        character
    })?;
    let Some(character) = selected else {
        return Err(HandlerError::failed(format!("character slot {slot} is empty")));
    };

    debug!(connection = %connection.id(), "Selected character '{}'", character.name);
    enter_phase(connection, Phase::CharacterSelect).await
}

async fn on_enter_game(realm: Arc<Realm>, ctx: PacketContext<EnterGame>) -> HandlerResult {
    let connection = &ctx.connection;
    let character = realm
        .session(connection.id(), |session| session.selected.clone())?
        .ok_or_else(|| HandlerError::failed("no character selected"))?;

    let player = realm.world.spawn_player(&character).await;
    connection.set_entity(player.vid);
    let items = realm.session(connection.id(), |session| {
        session.vid = Some(player.vid);
        session.inventory_packets()
    })?;

    enter_phase(connection, Phase::InWorld).await?;
    connection
        .send(&CharacterDetails {
            vid: player.vid.0,
            class: character.class,
            name: character.name.as_str().into(),
            x: player.x,
            y: player.y,
            z: 0,
            empire: character.empire,
            skill_group: character.skill_group,
        })
        .await?;
    for item in &items {
        connection.send(item).await?;
    }

    let spawn = spawn_packet(&player);
    ctx.server.connections().broadcast(&spawn, Phase::InWorld.into());

    for other in ctx.server.connections().snapshot() {
        if other.id() == connection.id() || other.phase() != Phase::InWorld {
            continue;
        }
        let Some(vid) = other.entity() else { continue };
        if let Some(existing) = realm.world.get(vid).await {
            connection.send(&spawn_packet(&existing)).await?;
        }
    }

    info!(connection = %connection.id(), "🌍 '{}' entered the world as entity {}", character.name, player.vid);
    Ok(())
}

async fn on_character_move(realm: Arc<Realm>, ctx: PacketContext<CharacterMove>) -> HandlerResult {
    let vid = player_entity(&ctx.connection)?;
    let movement = &ctx.packet;
    realm
        .world
        .move_player(vid, movement.x, movement.y, movement.rotation)
        .await?;

    let update = CharacterMoveOut {
        movement_type: movement.movement_type,
        argument: movement.argument,
        rotation: movement.rotation,
        vid: vid.0,
        x: movement.x,
        y: movement.y,
        time: ctx.server.server_time(),
        duration: 0,
    };
    ctx.server.connections().broadcast(&update, Phase::InWorld.into());
    Ok(())
}

async fn on_chat(realm: Arc<Realm>, ctx: PacketContext<ChatIncoming>) -> HandlerResult {
    let vid = player_entity(&ctx.connection)?;
    let player = realm.world.get(vid).await.ok_or(WorldError::EntityNotFound(vid))?;

    let text = format!("{} : {}", player.name, ctx.packet.message.as_str());
    let message = ChatOutgoing {
        message_type: ctx.packet.message_type,
        vid: vid.0,
        empire: player.empire,
        message: FixedStr::new(text),
    };
    let delivered = ctx.server.connections().broadcast(&message, Phase::InWorld.into());
    debug!(connection = %ctx.connection.id(), "💬 Chat delivered to {} players", delivered);
    Ok(())
}

async fn on_quick_bar_add(realm: Arc<Realm>, ctx: PacketContext<QuickBarAdd>) -> HandlerResult {
    let connection = &ctx.connection;
    if connection.entity().is_none() {
        return Err(HandlerError::close("quick bar change without a player"));
    }

    let position = ctx.packet.position;
    if position as usize >= QUICK_BAR_SLOTS {
        return Err(HandlerError::failed(format!("quick bar position {position} out of range")));
    }
    let slot = ctx.packet.slot;
    realm.session(connection.id(), |session| session.quick_bar[position as usize] = Some(slot))?;

    connection.send(&QuickBarAdded { position, slot }).await?;
    Ok(())
}

async fn on_target_change(realm: Arc<Realm>, ctx: PacketContext<TargetChange>) -> HandlerResult {
    let target = ctx.packet.target_vid;
    let reply = match realm.world.get(EntityId(target)).await {
        Some(_) if target != 0 => TargetOut {
            target_vid: target,
            percentage: 100,
        },
        _ => TargetOut {
            target_vid: 0,
            percentage: 0,
        },
    };
    ctx.connection.send(&reply).await?;
    Ok(())
}

async fn on_item_move(realm: Arc<Realm>, ctx: PacketContext<ItemMove>) -> HandlerResult {
    let request = &ctx.packet;
    let changed = realm.session(ctx.connection.id(), |session| {
        session.move_item(
            (request.from_window, request.from_position),
            (request.to_window, request.to_position),
            request.count,
        )
    })?;
    let changed = changed.map_err(|e| HandlerError::failed(e.to_string()))?;

    for item in &changed {
        ctx.connection.send(item).await?;
    }
    Ok(())
}

async fn on_item_use(realm: Arc<Realm>, ctx: PacketContext<ItemUse>) -> HandlerResult {
    let cell = (ctx.packet.window, ctx.packet.position);
    let changed = realm
        .session(ctx.connection.id(), |session| session.use_item(cell))?
        .map_err(|e| HandlerError::failed(e.to_string()))?;

    debug!(connection = %ctx.connection.id(), "Used item at {:?}", cell);
    ctx.connection.send(&changed).await?;
    Ok(())
}

/// Drops the session and removes the character from everyone's view.
async fn on_close(realm: Arc<Realm>, connection: Arc<Connection>, server: ServerContext) -> HandlerResult {
    let Some((_, session)) = realm.sessions.remove(&connection.id()) else {
        return Ok(());
    };
    if let Some(vid) = session.vid {
        server
            .connections()
            .broadcast(&RemoveCharacter { vid: vid.0 }, Phase::InWorld.into());
    }
    Ok(())
}
