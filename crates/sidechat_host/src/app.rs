//! Terminal shell: one process standing in for the browser, each context
//! wired over channels the way the message flow dictates. Typed text
//! plays the part of a page selection; the relay, panel host and chat ui
//! run their real state machines in between.

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use relay_logging::{relay_debug, relay_info};
use sidechat_core::conversation::{Conversation, Role};
use sidechat_core::host::{HostEvent, WindowRef};
use sidechat_core::relay::{RelayEvent, WindowId};
use sidechat_core::{selection, BusSender, TabId, PORT_PANEL_CLOSED};
use sidechat_engine::{AuthClient, EngineHandle, FileTokenStore, ReqwestChatBackend, TokenStore};

use crate::bus::{RuntimeBus, SurfaceCommand};
use crate::chat_ui::ChatUi;
use crate::config::AppConfig;
use crate::host_runtime::{HostRuntime, PANEL_ENDPOINT};
use crate::relay_runtime::{RelayRuntime, BACKGROUND_ENDPOINT};

/// Bus endpoint name of the simulated page's content script.
pub const CONTENT_ENDPOINT: &str = "content";

const SIM_WINDOW: WindowId = 1;
const SIM_TAB: TabId = 7;
const SIM_DOCUMENT: &str = "demo-document";
const UI_WINDOW: WindowRef = 11;
/// Origin of the (simulated) extension page embedding the iframe.
const HOST_ORIGIN: &str = "chrome-extension://sidechat";

pub fn run(config: AppConfig) -> io::Result<()> {
    relay_logging::set_context("shell");

    let bus = RuntimeBus::new();
    let (surface_tx, surface_rx) = mpsc::channel();
    let (iframe_tx, iframe_rx) = mpsc::channel();
    let (window_tx, window_rx) = mpsc::channel();
    let (port_tx, port_rx) = mpsc::channel();
    bus.set_port_listener(port_tx);

    // Background context: attach before anything can broadcast at it.
    let background_rx = bus.attach(BACKGROUND_ENDPOINT);
    let mut relay = RelayRuntime::new(
        bus.clone(),
        surface_tx.clone(),
        Box::new(|| Some(SIM_WINDOW)),
    );
    relay.handle(RelayEvent::CurrentWindowResolved {
        window_id: Some(SIM_WINDOW),
    });
    relay.handle(RelayEvent::NavigationCommitted {
        document_id: SIM_DOCUMENT.to_owned(),
        tab_id: SIM_TAB,
    });

    // Panel host context.
    let panel_rx = bus.attach(PANEL_ENDPOINT);
    let mut host = HostRuntime::new(
        &config.host,
        bus.clone(),
        surface_tx,
        iframe_tx,
        Box::new(|| Some(SIM_TAB)),
    );
    host.handle(HostEvent::IframeLoaded { window: UI_WINDOW });

    // Chat ui context, with the engine doing the network work.
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_path.clone()));
    let auth = AuthClient::new(config.auth.clone(), tokens);
    let engine = EngineHandle::new(Arc::new(ReqwestChatBackend::new(config.chat.clone())), auth);
    let ui_origin = sidechat_core::host::origin_of(&config.host.iframe_url)
        .unwrap_or_else(|| "*".to_owned());
    let mut ui = ChatUi::new(engine, UI_WINDOW, ui_origin.clone(), window_tx);
    ui.check_login();

    // Typed input arrives over its own channel so the shell never blocks.
    let (line_tx, line_rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    print_help();

    loop {
        let mut progressed = false;
        let mut dirty = false;

        while let Ok(delivery) = background_rx.try_recv() {
            relay.on_bus_value(delivery.value, delivery.sender);
            progressed = true;
        }
        while let Ok(name) = port_rx.try_recv() {
            if name == PORT_PANEL_CLOSED {
                relay.handle(RelayEvent::PanelPortDisconnected);
            }
            progressed = true;
        }
        while let Ok(delivery) = panel_rx.try_recv() {
            host.handle(HostEvent::BusMessage {
                value: delivery.value,
            });
            progressed = true;
        }
        // Host -> iframe posts; the browser would enforce the target
        // origin at delivery time, so the shell does too.
        while let Ok(post) = iframe_rx.try_recv() {
            if post.target_origin == "*" || post.target_origin == ui_origin {
                ui.on_host_post(HOST_ORIGIN, &post.value);
            }
            progressed = true;
            dirty = true;
        }
        while let Ok(envelope) = window_rx.try_recv() {
            host.handle(HostEvent::WindowMessage {
                source: envelope.source,
                origin: envelope.origin,
                value: envelope.value,
            });
            progressed = true;
        }
        while let Ok(command) = surface_rx.try_recv() {
            log_surface_command(&command);
            progressed = true;
        }
        if ui.pump_engine() {
            progressed = true;
            dirty = true;
        }

        match line_rx.try_recv() {
            Ok(line) => {
                progressed = true;
                dirty = true;
                if !handle_line(line.trim(), &bus, &mut ui) {
                    break;
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => break,
        }

        if dirty {
            render(ui.conversation());
        }
        if !progressed {
            thread::sleep(Duration::from_millis(20));
        }
    }

    host.disconnect();
    Ok(())
}

fn handle_line(line: &str, bus: &RuntimeBus, ui: &mut ChatUi) -> bool {
    match line {
        "" => {}
        ":quit" => return false,
        ":send" => ui.send_clicked(),
        ":cancel" => ui.cancel_clicked(),
        ":options" => ui.open_options(),
        ":help" => print_help(),
        text if text.starts_with(':') => println!("未知命令：{text}（:help 查看帮助）"),
        text => emit_selection(bus, text),
    }
    true
}

/// The content-script side of a bubble click: normalize the selection and
/// fire the prefill at whoever is listening.
fn emit_selection(bus: &RuntimeBus, text: &str) {
    let Some(message) = selection::prefill_message(text) else {
        return;
    };
    let sender = BusSender {
        tab_id: Some(SIM_TAB),
        document_id: Some(SIM_DOCUMENT.to_owned()),
    };
    if bus
        .broadcast(CONTENT_ENDPOINT, message.to_value(), sender)
        .is_err()
    {
        relay_debug!("selection prefill had no receiver");
    }
}

fn log_surface_command(command: &SurfaceCommand) {
    match command {
        SurfaceCommand::OpenPanel { window_id } => {
            relay_info!("side panel opened (window {window_id:?})");
        }
        SurfaceCommand::ClosePanel => relay_info!("side panel closed"),
        SurfaceCommand::SetIframeSrc { url } => relay_info!("iframe src set to {url}"),
        SurfaceCommand::HideLoading => relay_debug!("loading indicator hidden"),
        SurfaceCommand::OpenOptionsPage => println!("[设置页已打开]"),
    }
}

fn render(conversation: &Conversation) {
    println!("----------------------------------------");
    for message in conversation.messages() {
        let label = match message.role {
            Role::User => "你",
            Role::Assistant => "助手",
        };
        println!("{label}: {}", message.text);
    }
    if !conversation.input().is_empty() {
        println!("[输入框] {}", conversation.input());
    }
}

fn print_help() {
    println!("sidechat 终端演示");
    println!("  输入任意文字      模拟页面划词，预填到聊天输入框");
    println!("  :send             发送输入框内容");
    println!("  :cancel           取消正在进行的请求");
    println!("  :options          打开设置页");
    println!("  :help             显示帮助");
    println!("  :quit             退出");
}
