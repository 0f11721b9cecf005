//! Cloud Run submission service rendering
//!
//! The generated service receives a JSON payload of runtime parameter
//! values (posted directly or via the provisioned task queue) and submits
//! the compiled pipeline spec as a PipelineJob.

use crate::config::AndamioConfig;
use crate::emitter::{generated_banner, FileSet};
use crate::pipelines::PipelineError;

/// Render the `cloud_run/run_pipeline` service
pub fn build_cloudrun(config: &AndamioConfig) -> Result<FileSet, PipelineError> {
    let names = config.resource_names()?;
    let banner = generated_banner("#");

    let main_py = format!(
        "{banner}import logging\n\
         import os\n\
         \n\
         import flask\n\
         from google.cloud import aiplatform\n\
         \n\
         app = flask.Flask(__name__)\n\
         \n\
         PROJECT_ID = os.environ.get(\"PROJECT_ID\", \"{project}\")\n\
         REGION = os.environ.get(\"REGION\", \"{region}\")\n\
         PIPELINE_ROOT = os.environ.get(\"PIPELINE_ROOT\", \"gs://{bucket}/pipeline_root\")\n\
         PIPELINE_RUNNER_SA = os.environ.get(\n\
         \x20   \"PIPELINE_RUNNER_SA\", \"pipeline-runner-sa@{project}.iam.gserviceaccount.com\"\n\
         )\n\
         PIPELINE_SPEC_PATH = os.environ.get(\"PIPELINE_SPEC_PATH\", \"pipeline_spec.yaml\")\n\
         \n\
         \n\
         @app.route(\"/\", methods=[\"POST\"])\n\
         def submit_pipeline_job():\n\
         \x20   \"\"\"Submits a PipelineJob with the posted parameter values.\"\"\"\n\
         \x20   payload = flask.request.get_json(silent=True)\n\
         \x20   if payload is None or \"parameter_values\" not in payload:\n\
         \x20       return flask.jsonify(error=\"missing parameter_values\"), 400\n\
         \n\
         \x20   aiplatform.init(project=PROJECT_ID, location=REGION)\n\
         \x20   job = aiplatform.PipelineJob(\n\
         \x20       display_name=\"{pipeline}\",\n\
         \x20       template_path=PIPELINE_SPEC_PATH,\n\
         \x20       pipeline_root=PIPELINE_ROOT,\n\
         \x20       parameter_values=payload[\"parameter_values\"],\n\
         \x20       enable_caching=payload.get(\"enable_caching\", False),\n\
         \x20   )\n\
         \x20   job.submit(service_account=PIPELINE_RUNNER_SA)\n\
         \x20   logging.info(\"Submitted pipeline job: %s\", job.display_name)\n\
         \x20   return flask.jsonify(job=job.display_name), 200\n\
         \n\
         \n\
         if __name__ == \"__main__\":\n\
         \x20   app.run(host=\"0.0.0.0\", port=int(os.environ.get(\"PORT\", 8080)))\n",
        banner = banner,
        project = config.project.project_id,
        region = config.project.region,
        bucket = names.bucket,
        pipeline = names.pipeline
    );

    let requirements = format!(
        "{banner}flask\n\
         gunicorn\n\
         google-cloud-aiplatform\n\
         pyyaml\n",
        banner = banner
    );

    let dockerfile = format!(
        "{banner}FROM {base}\n\
         \n\
         WORKDIR /app\n\
         COPY requirements.txt .\n\
         RUN python -m pip install --no-cache-dir -r requirements.txt\n\
         COPY . .\n\
         \n\
         CMD exec gunicorn --bind :$PORT --workers 1 --threads 8 --timeout 0 main:app\n",
        banner = banner,
        base = config.pipeline.base_image
    );

    let mut files = FileSet::new();
    files.push("cloud_run/run_pipeline/main.py", main_py)?;
    files.push("cloud_run/run_pipeline/requirements.txt", requirements)?;
    files.push("cloud_run/run_pipeline/Dockerfile", dockerfile)?;
    Ok(files)
}
