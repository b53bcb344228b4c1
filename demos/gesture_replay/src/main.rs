use std::cell::RefCell;
use std::rc::Rc;

use repose_gesture::*;

type Script = fn(&mut TouchStream) -> Vec<TouchSample>;

fn tap_once(t: &mut TouchStream) -> Vec<TouchSample> {
    vec![t.down(0, 200.0, 300.0, 0), t.up(0, 70)]
}

fn double_tap(t: &mut TouchStream) -> Vec<TouchSample> {
    vec![
        t.down(0, 200.0, 300.0, 0),
        t.up(0, 60),
        t.down(0, 204.0, 298.0, 180),
        t.up(0, 240),
    ]
}

fn hold(t: &mut TouchStream) -> Vec<TouchSample> {
    vec![
        t.down(0, 120.0, 120.0, 0),
        t.move_to(0, 122.0, 121.0, 300),
        t.move_to(0, 180.0, 121.0, 700),
        t.up(0, 900),
    ]
}

fn slow_drag(t: &mut TouchStream) -> Vec<TouchSample> {
    let mut samples = vec![t.down(0, 40.0, 400.0, 0)];
    for i in 1..=20u64 {
        samples.push(t.move_to(0, 40.0 + 6.0 * i as f32, 400.0, i * 40));
    }
    samples.push(t.up(0, 840));
    samples
}

fn flick(t: &mut TouchStream) -> Vec<TouchSample> {
    vec![
        t.down(0, 40.0, 400.0, 0),
        t.move_to(0, 90.0, 402.0, 40),
        t.move_to(0, 190.0, 404.0, 90),
        t.up(0, 110),
    ]
}

fn twist(t: &mut TouchStream) -> Vec<TouchSample> {
    let mut samples = vec![t.down(0, 200.0, 200.0, 0), t.down(1, 300.0, 200.0, 10)];
    for i in 1..=6u64 {
        let (s, c) = (0.1 * i as f32).sin_cos();
        samples.push(t.move_to(1, 200.0 + 100.0 * c, 200.0 + 100.0 * s, 10 + i * 30));
    }
    samples.push(t.up(1, 220));
    samples.push(t.up(0, 240));
    samples
}

fn describe(r: &dyn Recognizer) -> String {
    if let Some(tap) = r.downcast_ref::<TapRecognizer>() {
        return format!("{} taps at {:?}", tap.number_of_taps(), tap.location());
    }
    if let Some(press) = r.downcast_ref::<LongPressRecognizer>() {
        return format!("press at {:?}", press.location());
    }
    if let Some(pan) = r.downcast_ref::<PanRecognizer>() {
        return format!(
            "translation {:?}, velocity {:?}",
            pan.translation(),
            pan.velocity()
        );
    }
    if let Some(swipe) = r.downcast_ref::<SwipeRecognizer>() {
        return format!("{:?} at {:?}", swipe.direction(), swipe.velocity());
    }
    if let Some(rotate) = r.downcast_ref::<RotateRecognizer>() {
        return format!("{:.1} degrees", rotate.rotation_in_degrees());
    }
    String::new()
}

fn build_set(journal: &Rc<RefCell<Vec<String>>>) -> anyhow::Result<RecognizerSet> {
    let mut set = RecognizerSet::with_delegate(
        FnDelegate::new().simultaneous_when(|r, other| {
            // A pan and a swipe may run together; nothing else may.
            let pair = [r.kind(), other.kind()];
            pair.contains(&GestureKind::Pan) && pair.contains(&GestureKind::Swipe)
        }),
    );

    let double = set.add(TapRecognizer::with_config(TapConfig {
        taps_required: 2,
        ..TapConfig::default()
    })?);
    let single = set.add(TapRecognizer::new());
    let press = set.add(LongPressRecognizer::new());
    let pan = set.add(PanRecognizer::new());
    let swipe = set.add(SwipeRecognizer::towards(Directions::HORIZONTAL)?);
    let rotate = set.add(RotateRecognizer::new());

    set.require_failure_of(single, double)?;
    set.require_failure_of(pan, swipe)?;

    for key in [double, single, press, pan, swipe, rotate] {
        let Some(r) = set.get_mut(key) else {
            continue;
        };
        let sink = journal.clone();
        r.core_mut().set_action_listener(move |r| {
            sink.borrow_mut()
                .push(format!("{:?} {:?}: {}", r.kind(), r.state(), describe(r)));
        });
    }
    Ok(set)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let scripts: [(&str, Script); 6] = [
        ("tap", tap_once),
        ("double tap", double_tap),
        ("hold", hold),
        ("slow drag", slow_drag),
        ("flick", flick),
        ("twist", twist),
    ];

    for (name, script) in scripts {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut set = build_set(&journal)?;
        let mut touches = TouchStream::new();
        let samples = script(&mut touches);

        let mut handled = 0;
        for sample in &samples {
            if set.process_sample(sample) {
                handled += 1;
            }
        }
        // Let pending timeouts resolve.
        if let Some(last) = samples.last() {
            set.advance_to(last.event_time + 1_000);
        }
        log::debug!("{name}: next deadline {:?}", set.next_deadline());

        println!("== {name} ({} samples, {handled} handled)", samples.len());
        for line in journal.borrow().iter() {
            println!("   {line}");
        }
    }
    Ok(())
}
