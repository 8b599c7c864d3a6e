use packline::{Coordinator, Idle, Phase, RunParams, RunReport, RunState};
use rstest::rstest;
use std::collections::HashMap;

struct Event {
    line: usize,
    worker: usize,
    sequence_id: u64,
}

struct ParsedLog {
    puts: Vec<Event>,
    gets: Vec<(Event, usize)>,
    made: Vec<u64>,
    packed: Vec<u64>,
}

fn number(text: &str) -> u64 {
    text.parse().unwrap_or_else(|_| panic!("not a number: {text:?}"))
}

fn parse(text: &str, params: &RunParams) -> ParsedLog {
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], format!("order:{}", params.order));
    assert_eq!(lines[1], format!("capacity:{}", params.capacity));
    assert_eq!(lines[2], format!("making machines:{}", params.makers));
    assert_eq!(lines[3], format!("packing machines:{}", params.packers));
    assert_eq!(lines[4], "-----");

    let mut parsed = ParsedLog {
        puts: Vec::new(),
        gets: Vec::new(),
        made: Vec::new(),
        packed: Vec::new(),
    };

    let mut index = 5;
    while lines[index] != "-----" {
        let words: Vec<&str> = lines[index].split(' ').collect();
        match words.as_slice() {
            [maker, "puts", id] => parsed.puts.push(Event {
                line: index,
                worker: number(&maker[1..]) as usize,
                sequence_id: number(id),
            }),
            [packer, "gets", id, "from", maker] => parsed.gets.push((
                Event {
                    line: index,
                    worker: number(&packer[1..]) as usize,
                    sequence_id: number(id),
                },
                number(&maker[1..]) as usize,
            )),
            _ => panic!("unexpected line {index}: {:?}", lines[index]),
        }
        index += 1;
    }

    assert_eq!(lines[index + 1], "summary:");
    for line in &lines[index + 2..] {
        let words: Vec<&str> = line.split(' ').collect();
        match words.as_slice() {
            [_, "made", count] => parsed.made.push(number(count)),
            [_, "packed", count] => parsed.packed.push(number(count)),
            _ => panic!("unexpected summary line: {line:?}"),
        }
    }

    parsed
}

fn run(params: RunParams) -> (RunReport<Vec<u8>>, ParsedLog) {
    let report = Coordinator::new(params, &Idle, Vec::new())
        .unwrap()
        .run()
        .unwrap();
    let text = String::from_utf8(report.sink.clone()).unwrap();
    let parsed = parse(&text, &params);
    (report, parsed)
}

fn assert_line_invariants(params: &RunParams, report: &RunReport<Vec<u8>>, log: &ParsedLog) {
    assert_eq!(report.state, RunState::Done);

    // Every id is produced exactly once. Makers log after committing, so
    // puts lines of different makers may interleave out of id order.
    let mut produced: Vec<u64> = log.puts.iter().map(|e| e.sequence_id).collect();
    produced.sort_unstable();
    assert_eq!(produced, (1..=params.order).collect::<Vec<_>>());

    // Every id is consumed exactly once, after its produce line, and
    // attributed to the maker that produced it.
    let mut consumed: Vec<u64> = log.gets.iter().map(|(e, _)| e.sequence_id).collect();
    consumed.sort_unstable();
    assert_eq!(consumed, produced);

    let put_by_id: HashMap<u64, &Event> = log.puts.iter().map(|e| (e.sequence_id, e)).collect();
    for (get, maker) in &log.gets {
        let put = put_by_id[&get.sequence_id];
        assert!(put.line < get.line, "unit {} consumed before produced", get.sequence_id);
        assert_eq!(put.worker, *maker);
        assert!((1..=params.packers).contains(&get.worker));
    }

    // With one packer, log order is removal order, which is FIFO.
    if params.packers == 1 {
        let ordered: Vec<u64> = log.gets.iter().map(|(e, _)| e.sequence_id).collect();
        assert_eq!(ordered, produced);
    }

    assert_eq!(log.made.len(), params.makers);
    assert_eq!(log.packed.len(), params.packers);
    assert_eq!(log.made.iter().sum::<u64>(), params.order);
    assert_eq!(log.packed.iter().sum::<u64>(), params.order);
    assert_eq!(log.made, report.tallies.made);
    assert_eq!(log.packed, report.tallies.packed);

    for (index, made) in log.made.iter().enumerate() {
        let lines = log.puts.iter().filter(|e| e.worker == index + 1).count() as u64;
        assert_eq!(lines, *made);
    }

    assert!(report.stats.peak_occupied <= params.capacity);
    assert_eq!(report.stats.occupied, 0);
    assert!(report.stats.finished);
}

#[test]
fn test_single_maker_single_packer_log() {
    let params = RunParams {
        order: 5,
        capacity: 2,
        makers: 1,
        packers: 1,
    };
    let (report, _) = run(params);
    let text = String::from_utf8(report.sink).unwrap();

    let gets: Vec<&str> = text.lines().filter(|l| l.contains(" gets ")).collect();
    assert_eq!(
        gets,
        [
            "p1 gets 1 from m1",
            "p1 gets 2 from m1",
            "p1 gets 3 from m1",
            "p1 gets 4 from m1",
            "p1 gets 5 from m1"
        ]
    );
    assert!(text.ends_with("-----\nsummary:\nm1 made 5\np1 packed 5\n"));
}

#[rstest]
#[case::minimal(2, 1, 1, 1)]
#[case::small(5, 2, 1, 1)]
#[case::mixed(100, 4, 3, 2)]
#[case::capacity_one_below_order(50, 49, 4, 4)]
#[case::one_slot_many_makers(200, 1, 8, 3)]
#[case::many_packers(300, 5, 2, 30)]
#[case::more_makers_than_units(10, 3, 16, 2)]
fn test_run_invariants(
    #[case] order: u64,
    #[case] capacity: usize,
    #[case] makers: usize,
    #[case] packers: usize,
) {
    let params = RunParams {
        order,
        capacity,
        makers,
        packers,
    };
    let (report, log) = run(params);
    assert_line_invariants(&params, &report, &log);
}

#[test]
fn test_repeated_stress_runs() {
    let params = RunParams {
        order: 2_000,
        capacity: 3,
        makers: 12,
        packers: 30,
    };
    for _ in 0..5 {
        let (report, log) = run(params);
        assert_line_invariants(&params, &report, &log);
    }
}

#[test]
fn test_slow_packers_keep_buffer_bounded() {
    let params = RunParams {
        order: 40,
        capacity: 4,
        makers: 4,
        packers: 2,
    };
    let work = |phase: Phase| {
        if phase == Phase::Finish {
            std::thread::sleep(std::time::Duration::from_micros(200));
        }
    };
    let report = Coordinator::new(params, &work, Vec::new())
        .unwrap()
        .run()
        .unwrap();
    let text = String::from_utf8(report.sink.clone()).unwrap();
    let log = parse(&text, &params);
    assert_line_invariants(&params, &report, &log);
    assert_eq!(report.stats.peak_occupied, 4);
}
