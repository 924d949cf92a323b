pub mod u500_sales_workflow;
pub mod u501_seed_sample_data;
pub mod u502_query_showcase;
pub mod u503_discount_category;
pub mod u504_export_csv;
