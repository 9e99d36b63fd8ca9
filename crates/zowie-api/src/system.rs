// System module endpoints
//
// Identity, dashboard load, clock, run status, power, and reboot.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::ProtocolClient;
use crate::envelope::{Module, Request};
use crate::error::Error;
use crate::models::{Dashboard, RunStatus, SystemAttributes};

impl ProtocolClient {
    /// Device identity and firmware versions.
    ///
    /// `/system getinfo {"group": "sys_attr", "opt": "get_sys_attr_info"}`
    pub async fn system_attributes(&self) -> Result<SystemAttributes, Error> {
        let request = Request::get(Module::System, "sys_attr").opt("get_sys_attr_info");
        self.execute(&request).await?.decode()
    }

    /// Uptime, CPU and memory load.
    ///
    /// `/system getinfo {"group": "get_dashboard_info"}`
    pub async fn dashboard(&self) -> Result<Dashboard, Error> {
        let request = Request::get(Module::System, "get_dashboard_info");
        self.execute(&request).await?.decode()
    }

    /// Device clock. Cheap and unauthenticated, so it doubles as a reachability probe.
    ///
    /// `/system getinfo {"group": "systime", "opt": "get_systime_info"}`
    pub async fn system_time(&self) -> Result<Map<String, Value>, Error> {
        let request = Request::get(Module::System, "systime").opt("get_systime_info");
        self.execute(&request).await?.decode()
    }

    /// Whether the device answers at all.
    pub async fn ping(&self) -> Result<(), Error> {
        self.system_time().await.map(|_| ())
    }

    /// Running or standby.
    ///
    /// `/system getinfo {"group": "syscontrol", "opt": "get_run_status"}`
    pub async fn run_status(&self) -> Result<RunStatus, Error> {
        let request = Request::get(Module::System, "syscontrol").opt("get_run_status");
        self.execute(&request).await?.decode()
    }

    /// Put the device into standby.
    pub async fn power_off(&self) -> Result<(), Error> {
        debug!("entering standby");
        let request = Request::set(Module::System, "syscontrol").opt("power_off");
        self.execute(&request).await.map(|_| ())
    }

    /// Wake the device from standby.
    pub async fn power_on(&self) -> Result<(), Error> {
        debug!("leaving standby");
        let request = Request::set(Module::System, "syscontrol").opt("power_on");
        self.execute(&request).await.map(|_| ())
    }

    /// Reboot the device.
    ///
    /// The device often drops the connection or times out mid-reply; those,
    /// like a restart status, count as success. Auth failures still surface.
    pub async fn reboot(&self) -> Result<(), Error> {
        let request = Request::set(Module::System, "syscontrol")
            .opt("set_reboot_info")
            .data(json!({ "command": "reboot" }))
            .expecting_restart();

        match self.execute(&request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_unreachable() || matches!(e, Error::Deserialization { .. }) => {
                debug!(error = %e, "reboot sent, device went away");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
