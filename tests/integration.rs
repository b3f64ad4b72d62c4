use std::rc::Rc;

use listing_stats::{
    AggregationPipeline, AnalysisConfig, FilterPredicate, ProcessorError, QueryCache, RecordSet,
    Statistic, SummaryCell, Value, source,
};

const LISTINGS: &str = "\
id,name,host_id,neighbourhood_group,room_type,price
2539,\"Clean & quiet apt, home by the park\",2787,Brooklyn,Private room,149
2595,Skylit Midtown Castle,2845,Manhattan,Entire home/apt,225
3647,THE VILLAGE OF HARLEM....NEW YORK !,4632,Manhattan,Private room,150
3831,Cozy Entire Floor of Brownstone,4869,Brooklyn,Entire home/apt,89
5022,\"Entire Apt: Spacious Studio/Loft by central park\",7192,Manhattan,Entire home/apt,80
5099,Large Cozy 1 BR Apartment In Midtown East,7322,Manhattan,Entire home/apt,200
5121,BlissArtsSpace!,7356,Brooklyn,Private room,60
5178,\"Large Furnished Room Near B'way\",8967,Manhattan,Private room,79
5203,Cozy Clean Guest Room - Family Apt,7490,Manhattan,Private room,79
5238,Cute & Cozy Lower East Side 1 bdrm,7549,Manhattan,Entire home/apt,150
5295,Beautiful 1br on Upper West Side,7702,Manhattan,Entire home/apt,135
5441,Central Manhattan/near Broadway,7989,Manhattan,Private room,85
7750,Huge 2 BR Upper East  Cental Park,17985,Manhattan,Entire home/apt,190
9518,Astoria Room,31374,Queens,Shared room,40
9657,Modern 1 BR / NYC,32294,Manhattan,Entire home/apt,9999
";

fn load_listings(csv: &str) -> Result<RecordSet, ProcessorError> {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{}", csv).unwrap();

    let rows = source::load_csv(tmp.path())?;
    RecordSet::load(rows, &AnalysisConfig::default().schema)
}

fn labelled(pairs: &[(&str, usize)]) -> Vec<(Value, usize)> {
    pairs.iter().map(|&(l, c)| (Value::from(l), c)).collect()
}

#[test]
fn test_end_to_end_report() {
    let records = load_listings(LISTINGS).unwrap();
    assert_eq!(records.len(), 15);
    assert_eq!(records.get(0).unwrap().extra("host_id"), Some(&Value::from("2787")));

    let pipeline = AggregationPipeline::cached(records, AnalysisConfig::default());
    let report = pipeline.report().unwrap();

    assert_eq!(
        report.group_counts.pairs(),
        labelled(&[("Manhattan", 11), ("Brooklyn", 3), ("Queens", 1)])
    );
    assert_eq!(
        report.room_type_counts.pairs(),
        labelled(&[("Entire home/apt", 8), ("Private room", 6), ("Shared room", 1)])
    );

    let brooklyn = report
        .price_by_group
        .get(&["Brooklyn"])
        .and_then(SummaryCell::summary)
        .unwrap();
    assert_eq!(brooklyn.count, 3);
    assert_eq!(brooklyn.p50, 89.0);

    let queens_shared = report
        .price_by_group_and_room_type
        .get(&["Queens", "Shared room"])
        .and_then(SummaryCell::summary)
        .unwrap();
    assert_eq!(queens_shared.count, 1);
    assert_eq!(queens_shared.std_dev, Statistic::Undefined);

    // the luxury listing stays in every canonical statistic
    let overall = report.price_summary.summary().unwrap();
    assert_eq!(overall.max, 9999.0);
    assert_eq!(report.display_histogram.excluded, 1);
    assert_eq!(report.display_histogram.histogram.as_ref().unwrap().total(), 14);
    assert_eq!(report.full_histogram.as_ref().unwrap().total(), 15);
}

#[test]
fn test_report_serializes_undefined_markers() {
    let records = load_listings(LISTINGS).unwrap();
    let pipeline = AggregationPipeline::new(records, AnalysisConfig::default());
    let json = serde_json::to_value(pipeline.report().unwrap()).unwrap();

    let rows = json["price_by_group_and_room_type"]["rows"].as_array().unwrap();
    let queens = rows
        .iter()
        .find(|row| row["key"][0] == "Queens")
        .unwrap();
    assert!(queens["summary"]["std_dev"].is_null());
    assert_eq!(queens["summary"]["count"], 1);
}

#[test]
fn test_negative_price_rejects_file() {
    let csv = "neighbourhood_group,room_type,price\nBronx,Private room,40\nBronx,Private room,-10\n";
    let err = load_listings(csv).unwrap_err();
    assert!(matches!(err, ProcessorError::Type { row: 1, .. }));
}

#[test]
fn test_missing_price_column_is_schema_error() {
    let csv = "neighbourhood_group,room_type,cost\nBronx,Private room,40\n";
    let err = load_listings(csv).unwrap_err();
    assert!(matches!(err, ProcessorError::Schema { row: 0, .. }));
}

#[test]
fn test_blank_borough_is_unpartitioned_not_merged() {
    let csv = "neighbourhood_group,room_type,price\nBronx,Private room,40\n,Private room,55\n";
    let records = load_listings(csv).unwrap();
    let pipeline = AggregationPipeline::new(records, AnalysisConfig::default());

    let grouped = pipeline
        .grouped_summary(&["neighbourhood_group"], "price")
        .unwrap();
    assert_eq!(grouped.rows.len(), 1);
    assert_eq!(grouped.unpartitioned, 1);

    let counts = pipeline.value_counts("neighbourhood_group").unwrap();
    assert_eq!(counts.pairs(), labelled(&[("Bronx", 1)]));
    assert_eq!(counts.missing, 1);
}

#[test]
fn test_cached_summary() {
    let records = load_listings(LISTINGS).unwrap();
    let cache = Rc::new(QueryCache::new());
    let pipeline =
        AggregationPipeline::new(records, AnalysisConfig::default()).with_cache(Rc::clone(&cache));

    let first = pipeline
        .query()
        .filter(
            "neighbourhood_group",
            FilterPredicate::Equals(Value::from("Manhattan")),
        )
        .describe("price")
        .execute()
        .unwrap()
        .into_summary()
        .unwrap();
    let second = pipeline
        .query()
        .filter(
            "neighbourhood_group",
            FilterPredicate::Equals(Value::from("Manhattan")),
        )
        .describe("price")
        .execute()
        .unwrap()
        .into_summary()
        .unwrap(); // from cache
    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);

    let unfiltered = pipeline.summary("price").unwrap();
    assert_ne!(first, unfiltered);
    assert_eq!(cache.len(), 2);
}
