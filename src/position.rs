use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::debug;

use crate::dom::{self, px, InlineStyle};
use crate::error::HookError;
use crate::events::{EventKind, EventTargets};
use crate::host::RenderHost;
use crate::properties::SelectListConfig;
use crate::schedule::{FrameClock, Scheduler};

const ARROW_SELECTOR: &str = ".rt-TooltipArrow";
const OPTION_VALUE_ATTR: &str = "data-select-option-value";

/// Wire hover-driven tooltip placement onto the floating element. The
/// binding itself is deferred and retried: the trigger (nearest preceding
/// element sibling) may be mounted a frame or two behind the tooltip.
pub fn bind_tooltip(
    scheduler: &Rc<Scheduler>,
    targets: &Rc<EventTargets>,
    host: &Rc<dyn RenderHost>,
    floating: &NodeRef,
) {
    let targets = Rc::clone(targets);
    let host = Rc::clone(host);
    let floating = floating.clone();
    scheduler.run_when_ready(move || {
        let trigger =
            dom::previous_element_sibling(&floating).ok_or(HookError::MissingTrigger)?;
        let arrow = floating
            .select_first(ARROW_SELECTOR)
            .ok()
            .map(|found| found.as_node().clone());

        let over_host = Rc::clone(&host);
        let over_trigger = trigger.clone();
        let over_floating = floating.clone();
        targets.add(&trigger, EventKind::MouseOver, move || {
            open_tooltip(&over_host, &over_trigger, &over_floating, arrow.as_ref())
        });

        let out_host = Rc::clone(&host);
        let out_floating = floating.clone();
        targets.add(&trigger, EventKind::MouseOut, move || {
            if out_host.popover_open(&out_floating) {
                out_host.hide_popover(&out_floating);
            }
            Ok(())
        });
        Ok(())
    });
}

fn open_tooltip(
    host: &Rc<dyn RenderHost>,
    trigger: &NodeRef,
    floating: &NodeRef,
    arrow: Option<&NodeRef>,
) -> Result<(), HookError> {
    if host.popover_open(floating) {
        return Ok(());
    }
    host.show_popover(floating);

    let trigger_rect = host.bounding_rect(trigger).ok_or(HookError::NotLaidOut)?;
    let float_rect = host.bounding_rect(floating).ok_or(HookError::NotLaidOut)?;
    let viewport = host.viewport();

    let top = trigger_rect.top - float_rect.height - 6.0;
    let desired_left =
        trigger_rect.left + trigger_rect.width / 2.0 - float_rect.width / 2.0 + 3.0;
    let left = desired_left.max(3.0);

    let mut style = InlineStyle::read(floating);
    style.set(
        "--radix-popper-transform-origin",
        format!("{} {}", px(top - 5.0), px(left)),
    );
    style.set(
        "--radix-popper-available-width",
        px(viewport.width - float_rect.width),
    );
    style.set(
        "--radix-popper-available-height",
        px(viewport.height - float_rect.height),
    );
    style.set("--radix-popper-anchor-width", px(trigger_rect.width));
    style.set("--radix-popper-anchor-height", px(trigger_rect.height));
    style.set("top", px(top));
    style.set("left", px(left));
    style.write(floating);

    // The arrow is positioned after the main styles so a missing arrow
    // still leaves the tooltip itself placed.
    let arrow = arrow.ok_or(HookError::MissingArrow)?;
    let mut arrow_style = InlineStyle::read(arrow);
    arrow_style.set("top", px(top + float_rect.height - 3.0));
    arrow_style.set(
        "left",
        px(trigger_rect.left - 3.0 + trigger_rect.width / 2.0),
    );
    arrow_style.write(arrow);
    Ok(())
}

/// Place an opening select/listbox relative to its parent trigger. The list
/// is hidden (pointer-events and opacity) before measuring and shown again
/// once coordinates are applied, so the user never sees the unpositioned
/// frame or loses focus to it.
pub fn open_select_list(
    clock: &Rc<FrameClock>,
    scheduler: &Rc<Scheduler>,
    host: &Rc<dyn RenderHost>,
    list: &NodeRef,
    config: SelectListConfig,
) {
    // Already placed while open; never reposition under the pointer.
    if dom::style_get(list, "top").is_some() {
        return;
    }
    dom::style_set(list, &[("pointer-events", "none"), ("opacity", "0")]);

    let scheduler = Rc::clone(scheduler);
    let host = Rc::clone(host);
    let list = list.clone();
    clock.request(move |_| {
        scheduler.run_when_ready(move || place_select_list(&host, &list, &config));
    });
}

fn place_select_list(
    host: &Rc<dyn RenderHost>,
    list: &NodeRef,
    config: &SelectListConfig,
) -> Result<(), HookError> {
    let Some(trigger) = dom::parent_element(list) else {
        // No trigger to align to; the source tolerates this silently.
        return Ok(());
    };
    let trigger_rect = host.bounding_rect(&trigger).ok_or(HookError::NotLaidOut)?;
    let list_rect = host.bounding_rect(list).ok_or(HookError::NotLaidOut)?;

    let mut style = InlineStyle::read(list);
    if config.is_popover_style {
        style.set("top", px(trigger_rect.bottom()));
        style.set("left", px(trigger_rect.left));
    } else {
        let option = config
            .value
            .as_deref()
            .and_then(|value| selected_option(list, value));
        debug!(target: "position", value = ?config.value, found = option.is_some(), "centering select list");

        let trigger_center = trigger_rect.center_y();
        let top = match option {
            Some(option) => {
                let option_rect = host.bounding_rect(&option).ok_or(HookError::NotLaidOut)?;
                list_rect.top + trigger_center - option_rect.center_y()
            }
            None => trigger_center - list_rect.height / 2.0,
        };
        style.set("top", px(top));
        style.set(
            "left",
            px((trigger_rect.center_x() - list_rect.width / 2.0).max(0.0)),
        );
    }
    style.set("pointer-events", "initial");
    style.set("opacity", "1");
    style.write(list);
    Ok(())
}

fn selected_option(list: &NodeRef, value: &str) -> Option<NodeRef> {
    let selector = format!("[{OPTION_VALUE_ATTR}=\"{value}\"]");
    list.select_first(&selector)
        .ok()
        .map(|found| found.as_node().clone())
}
