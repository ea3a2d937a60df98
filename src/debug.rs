use crate::waypoint::WayPoint;
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

/// Records a named path in the current debug frame.
#[allow(unused)]
pub fn debug_path(name: &str, path: &[WayPoint]) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        let points = path
            .iter()
            .map(|p| [p.pose.pos.x, p.pose.pos.y, p.velocity])
            .collect::<Vec<_>>();
        frame.borrow_mut().push(json!({
            "type": "path",
            "name": name,
            "points": points,
        }))
    })
}

/// Records a named scalar in the current debug frame.
#[allow(unused)]
pub fn debug_value(name: &str, value: f64) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "value",
            "name": name,
            "value": value,
        }))
    })
}

/// Takes everything recorded since the last call.
#[cfg(feature = "debug")]
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}

#[cfg(all(test, feature = "debug"))]
mod test {
    use super::*;

    #[test]
    fn frame_is_taken() {
        let path = [WayPoint::new(1.0, 2.0, 0.0, 0.0).with_velocity(3.0)];
        debug_path("reference", &path);
        debug_value("selected", 2.0);
        let frame = take_debug_frame();
        assert_eq!(frame[0]["name"], "reference");
        assert_eq!(frame[0]["points"][0][2], 3.0);
        assert_eq!(frame[1]["value"], 2.0);
        assert_eq!(take_debug_frame().as_array().map(|a| a.len()), Some(0));
    }
}
