//! Frame switching

use super::{ElementActions, Target};
use crate::session::traits::{FrameTarget, SearchRoot};
use crate::wait::{frame_available_and_switch, Query};

impl ElementActions {
    pub async fn switch_to_frame_by_index(&self, index: usize, step: Option<&str>) -> bool {
        self.enter_frame(FrameTarget::Index(index), format!("frame {}", index), step)
            .await
    }

    /// Frame whose `name` or `id` attribute is `name`
    pub async fn switch_to_frame_by_name(&self, name: &str, step: Option<&str>) -> bool {
        self.enter_frame(FrameTarget::NameOrId(name.to_string()), format!("frame '{}'", name), step)
            .await
    }

    /// Frame element addressed by `target`
    pub async fn switch_to_frame(&self, target: impl Into<Target>, step: Option<&str>) -> bool {
        let target = target.into();
        let wait = &self.wait;
        self.perform(step, format!("Switch to frame {}", target), async {
            let page = self.page().await?;
            let frame = self.locate(SearchRoot::Page(page.as_ref()), &target, Query::Presence).await?;
            let frame = &FrameTarget::Element(frame);
            let page = page.as_ref();
            wait.until(&format!("frame {}", target), move || frame_available_and_switch(page, frame))
                .await
        })
        .await
        .is_some()
    }

    async fn enter_frame(&self, frame: FrameTarget, name: String, step: Option<&str>) -> bool {
        let wait = &self.wait;
        self.perform(step, format!("Switch to {}", name), async {
            let page = self.page().await?;
            let (page, frame) = (page.as_ref(), &frame);
            wait.until(&name, move || frame_available_and_switch(page, frame))
                .await
        })
        .await
        .is_some()
    }

    pub async fn switch_to_parent_frame(&self, step: Option<&str>) -> bool {
        self.perform(step, "Switch to parent frame".to_string(), async {
            self.page().await?.switch_to_parent_frame().await
        })
        .await
        .is_some()
    }

    pub async fn switch_to_default_content(&self, step: Option<&str>) -> bool {
        self.perform(step, "Switch to default content".to_string(), async {
            self.page().await?.switch_to_default_content().await
        })
        .await
        .is_some()
    }
}
