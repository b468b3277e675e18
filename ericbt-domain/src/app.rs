//! Display application: what the screen shows as peers come and go and
//! commands arrive.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};

use crate::command::{Command, payload_text};
use crate::display::{CharacterDisplay, DisplayError, LCD_COLUMNS};
use crate::marquee::Marquee;
use crate::service::{ConnHandle, HookError, Radio, UartService};

pub const PROJECT_BANNER: &str = "https://github.com/electronf99/eric-LCD-BT-thingy ";

pub struct DisplayApp<D> {
    display: D,
    adv_name: String,
    peers: BTreeSet<ConnHandle>,
    marquee: Marquee,
}

impl<D: CharacterDisplay> DisplayApp<D> {
    /// Turn the backlight on and show the boot screen.
    pub fn new(mut display: D, adv_name: &str) -> Result<Self, DisplayError> {
        display.backlight_on()?;
        display.clear()?;
        display.move_to(0, 0)?;
        display.putstr(&format!("Wait {adv_name}"))?;
        Ok(Self {
            display,
            adv_name: adv_name.to_string(),
            peers: BTreeSet::new(),
            marquee: Marquee::new(PROJECT_BANNER, usize::from(LCD_COLUMNS)),
        })
    }

    pub fn on_connect(&mut self, conn: ConnHandle) -> Result<(), DisplayError> {
        self.peers.insert(conn);
        self.display.clear()?;
        self.display.move_to(0, 0)?;
        self.display.putstr("Connected")
    }

    pub fn on_disconnect(&mut self, conn: ConnHandle) -> Result<(), DisplayError> {
        self.peers.remove(&conn);
        info!("Disconnected");
        self.display.clear()?;
        self.display.move_to(0, 0)?;
        self.display.putstr(&self.adv_name)
    }

    /// Parse and apply a command, acknowledging with `OK:<text>`.
    pub fn on_receive(&mut self, payload: &[u8], _conn: ConnHandle) -> Result<Option<Vec<u8>>, HookError> {
        let text = payload_text(payload)?;
        debug!("{text}");
        let command = Command::parse(text)?;
        command.apply(&mut self.display)?;
        Ok(Some(format!("OK:{text}").into_bytes()))
    }

    /// Scroll the banner on the second row while nobody is connected.
    pub fn tick(&mut self) -> Result<(), DisplayError> {
        if self.is_connected() {
            return Ok(());
        }
        let window = self.marquee.advance();
        self.display.move_to(0, 1)?;
        self.display.putstr(&window)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.peers.is_empty()
    }

    #[must_use]
    pub fn display(&self) -> &D {
        &self.display
    }

}

impl<D> DisplayApp<D>
where
    D: CharacterDisplay + Send + 'static,
{
    /// Route the service's connect, disconnect and receive hooks to a shared app.
    pub fn attach<R: Radio>(app: &Arc<Mutex<Self>>, service: &mut UartService<R>) {
        let shared = Arc::clone(app);
        service.set_on_connect(move |conn| Ok(lock(&shared)?.on_connect(conn)?));
        let shared = Arc::clone(app);
        service.set_on_disconnect(move |conn| Ok(lock(&shared)?.on_disconnect(conn)?));
        let shared = Arc::clone(app);
        service.set_on_receive(move |payload, conn| lock(&shared)?.on_receive(payload, conn));
    }
}

fn lock<T>(shared: &Arc<Mutex<T>>) -> Result<MutexGuard<'_, T>, HookError> {
    shared.lock().map_err(|_| "display app lock poisoned".into())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::display::TextGrid;
    use crate::service::{AttrHandle, RadioEvent, ServiceConfig, UartHandles};

    fn app() -> DisplayApp<TextGrid> {
        DisplayApp::new(TextGrid::default(), "ericbt-04Ws").unwrap()
    }

    #[test]
    fn boot_screen_waits_with_the_name() {
        let app = app();
        assert_eq!(app.display().row_text(0), "Wait ericbt-04Ws");
        assert!(app.display().backlight());
        assert!(!app.is_connected());
    }

    #[test]
    fn idle_tick_scrolls_the_banner() {
        let mut app = app();
        app.tick().unwrap();
        assert_eq!(app.display().row_text(1), "ttps://github.co");
        app.tick().unwrap();
        assert_eq!(app.display().row_text(1), "tps://github.com");
    }

    #[test]
    fn connected_tick_leaves_the_screen_alone() {
        let mut app = app();
        app.on_connect(1).unwrap();
        app.tick().unwrap();
        assert_eq!(app.display().row_text(0), "Connected       ");
        assert_eq!(app.display().row_text(1), " ".repeat(16));
    }

    #[test]
    fn second_peer_leaving_keeps_the_first_connected() {
        let mut app = app();
        app.on_connect(1).unwrap();
        app.on_connect(2).unwrap();
        app.on_disconnect(2).unwrap();
        assert!(app.is_connected());
        assert_eq!(app.display().row_text(0), "ericbt-04Ws     ");
        app.on_disconnect(1).unwrap();
        app.on_disconnect(1).unwrap();
        assert!(!app.is_connected());
    }

    #[test]
    fn repeated_connect_is_one_peer() {
        let mut app = app();
        app.on_connect(4).unwrap();
        app.on_connect(4).unwrap();
        app.on_disconnect(4).unwrap();
        assert!(!app.is_connected());
    }

    #[test]
    fn receive_applies_and_acknowledges() {
        let mut app = app();
        app.on_connect(1).unwrap();
        let ack = app
            .on_receive(b" {\"BL\":\"off\",\"LCD1\":\"12:00:00\"}\n", 1)
            .unwrap();
        assert_eq!(ack, Some(b"OK:{\"BL\":\"off\",\"LCD1\":\"12:00:00\"}".to_vec()));
        assert!(!app.display().backlight());
        assert_eq!(app.display().row_text(0), "Connected       ");
        assert_eq!(app.display().row_text(1), "12:00:00        ");
    }

    #[test]
    fn bad_payload_is_an_error() {
        let mut app = app();
        assert!(app.on_receive(b"LCD0=hi", 1).is_err());
    }

    struct NullRadio {
        notified: Vec<Vec<u8>>,
    }

    impl Radio for NullRadio {
        type Error = String;

        fn address(&mut self) -> Option<Vec<u8>> {
            Some(vec![0x44, 0x06])
        }
        fn register_uart(&mut self) -> Result<UartHandles, String> {
            Ok(UartHandles { tx: 1, rx: 2 })
        }
        fn set_rx_buffer(&mut self, _rx: AttrHandle, _size: usize) -> Result<(), String> {
            Ok(())
        }
        fn set_preferred_mtu(&mut self, _mtu: u16) -> Result<(), String> {
            Ok(())
        }
        fn advertise(&mut self, _: Duration, _: &[u8], _: Option<&[u8]>) -> Result<(), String> {
            Ok(())
        }
        fn stop_advertising(&mut self) -> Result<(), String> {
            Ok(())
        }
        fn notify(&mut self, _conn: ConnHandle, _handle: AttrHandle, data: &[u8]) -> Result<(), String> {
            self.notified.push(data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn attached_app_follows_service_events() {
        let radio = NullRadio { notified: Vec::new() };
        let mut service = UartService::start(radio, ServiceConfig::default()).unwrap();
        let app = Arc::new(Mutex::new(
            DisplayApp::new(TextGrid::default(), service.adv_name()).unwrap(),
        ));
        DisplayApp::attach(&app, &mut service);

        service.handle_event(RadioEvent::Connect(7)).unwrap();
        service
            .handle_event(RadioEvent::Write {
                conn: 7,
                value_handle: 2,
                data: b"{\"LCD0\":\"hi\"}".to_vec(),
            })
            .unwrap();
        service
            .handle_event(RadioEvent::Write {
                conn: 7,
                value_handle: 2,
                data: b"not json".to_vec(),
            })
            .unwrap();
        assert_eq!(service.radio().notified, vec![b"OK:{\"LCD0\":\"hi\"}".to_vec()]);
        assert_eq!(app.lock().unwrap().display().row_text(0), "hinnected       ");

        service.handle_event(RadioEvent::Disconnect(7)).unwrap();
        assert_eq!(app.lock().unwrap().display().row_text(0), "ericbt-04Ws     ");
    }

    #[test]
    fn stray_disconnect_keeps_the_banner_off() {
        let radio = NullRadio { notified: Vec::new() };
        let mut service = UartService::start(radio, ServiceConfig::default()).unwrap();
        let app = Arc::new(Mutex::new(
            DisplayApp::new(TextGrid::default(), service.adv_name()).unwrap(),
        ));
        DisplayApp::attach(&app, &mut service);

        service.handle_event(RadioEvent::Connect(1)).unwrap();
        service.handle_event(RadioEvent::Disconnect(9)).unwrap();

        assert!(service.is_connected(1));
        let mut app = app.lock().unwrap();
        assert!(app.is_connected());
        app.tick().unwrap();
        assert_eq!(app.display().row_text(1), " ".repeat(16));
    }
}
