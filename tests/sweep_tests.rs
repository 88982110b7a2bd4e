use bloom_kstar::{
    BloomError, CsvSink, NoopObserver, SweepBuilder, TrialRecord,
    theoretical_fp_prob, theoretical_k_opt,
};

#[cfg(test)]
mod sweep_tests {
    use super::*;

    #[test]
    fn test_one_record_per_point_and_repeat() {
        let sweep = SweepBuilder::default()
            .m(4_000)
            .n(500)
            .queries(5_000)
            .points(4)
            .repeats(2)
            .build()
            .unwrap();
        let mut sink: Vec<TrialRecord> = Vec::new();
        let records = sweep.run_with(&NoopObserver, &mut sink).unwrap();

        assert_eq!(records, sink);
        assert_eq!(records.len(), 8);

        let k_star = theoretical_k_opt(4_000, 500);
        let ks: Vec<usize> = records.iter().map(|r| r.k).collect();
        assert_eq!(ks[..4], ks[4..]);
        assert!(ks.contains(&k_star));

        for rec in &records {
            assert_eq!(rec.theoretical_k_star, k_star);
            assert_eq!(
                rec.theoretical_fp,
                theoretical_fp_prob(4_000, 500, rec.k)
            );
        }
    }

    #[test]
    fn test_sweep_is_reproducible() {
        let sweep = SweepBuilder::default()
            .m(3_000)
            .n(300)
            .queries(2_000)
            .points(3)
            .build()
            .unwrap();
        let a = sweep
            .run_with(&NoopObserver, &mut Vec::<TrialRecord>::new())
            .unwrap();
        let b = sweep
            .run_with(&NoopObserver, &mut Vec::<TrialRecord>::new())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_csv_output() {
        let sweep = SweepBuilder::default()
            .m(2_000)
            .n(200)
            .queries(1_000)
            .points(3)
            .build()
            .unwrap();
        let mut sink = CsvSink::new(Vec::<u8>::new());
        sweep.run_with(&NoopObserver, &mut sink).unwrap();

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "m,n,k,empirical_fp,theoretical_fp,theoretical_kstar"
        );
        for line in &lines[1..] {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 6);
            assert_eq!(fields[0], "2000");
            assert_eq!(fields[1], "200");
            let fp: f64 = fields[3].parse().unwrap();
            assert!((0.0..=1.0).contains(&fp));
        }
    }

    #[test]
    fn test_zero_repeats_rejected() {
        let sweep = SweepBuilder::default()
            .m(2_000)
            .n(200)
            .repeats(0)
            .build()
            .unwrap();
        assert!(matches!(
            sweep.run_with(&NoopObserver, &mut Vec::<TrialRecord>::new()),
            Err(BloomError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let sweep =
            SweepBuilder::default().m(50_000).n(45_000).build().unwrap();
        assert_eq!(sweep.queries, 500_000);
        assert_eq!(sweep.points, 10);
        assert_eq!(sweep.repeats, 1);
        assert_eq!(sweep.ks(), (1..=10).collect::<Vec<_>>());
    }
}
