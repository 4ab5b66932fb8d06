use futures::{stream::FuturesOrdered, StreamExt};
use tokio::task::JoinHandle;

use crate::{bus::device::ChildDevice, target::Notification};

use super::target::Target;

/// Callback invoked for every host event of a target, together with the
/// target the event was meant for
pub type NotificationCallback = Box<dyn FnMut(&Target, Notification) + Send + 'static>;

/// Spawn a task keeping `depth` notification requests outstanding for the
/// given device. Completed requests are handed to the callback in
/// submission order and re-armed. The task stops once the requests are
/// cancelled.
pub fn spawn_pump(
    target: Target,
    device: ChildDevice,
    depth: usize,
    mut callback: NotificationCallback,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut requests = FuturesOrdered::new();
        for _ in 0..depth.max(1) {
            requests.push_back(device.submit_notification());
        }

        while let Some(result) = requests.next().await {
            match result {
                Ok(notification) => {
                    log::trace!("Device {} got notification: {notification:?}", device.id());
                    callback(&target, notification);
                    requests.push_back(device.submit_notification());
                }
                Err(e) => {
                    log::debug!("Notification pump for device {} stopped: {e}", device.id());
                    break;
                }
            }
        }
    })
}
