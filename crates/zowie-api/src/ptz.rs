// PTZ module endpoints
//
// Motion commands are opcodes; focus/zoom-to-point takes a `point`.

use crate::client::ProtocolClient;
use crate::envelope::{Module, Point, Request};
use crate::error::Error;

impl ProtocolClient {
    /// Issue a motion/control opcode (pan, tilt, zoom, stop, preset recall).
    pub async fn ptz_control(&self, opid: i64) -> Result<(), Error> {
        let request = Request::set(Module::Ptz, "ptz")
            .opt("ptz_control")
            .opid(opid);
        self.execute(&request).await.map(|_| ())
    }

    /// Focus on a position given as percentages of the frame.
    pub async fn ptz_focus_point(&self, point: Point) -> Result<(), Error> {
        let request = Request::set(Module::Ptz, "ptz")
            .opt("point_focus")
            .point(point);
        self.execute(&request).await.map(|_| ())
    }
}
